/// WebSocket transport for board sync.
///
/// Owns one background task per connection. The task dials the sync
/// endpoint, writes outbound `ClientMessage`s as JSON text frames, parses
/// inbound text frames into `BoardEvent`s, and redials after a fixed delay
/// whenever the link drops. Messages handed over while the link is down are
/// dropped. Dropping the transport closes the socket once queued frames are
/// flushed; [`WsTransport::closed`] resolves when that has happened.
use futures_util::{SinkExt, StreamExt};
use pgd_board_core::{BoardEvent, ClientMessage, Transport, TransportError, TransportEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsTransport {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    connected: Arc<AtomicBool>,
    done: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl WsTransport {
    /// Start dialing `url`. Must be called inside a tokio runtime.
    pub fn connect(
        url: String,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = watch::channel(false);

        let link = connected.clone();
        let task = tokio::spawn(async move {
            run_connection(url, reconnect_delay, outbound_rx, inbound_tx, link).await;
            let _ = done_tx.send(true);
        });

        (
            Self {
                outbound: outbound_tx,
                connected,
                done,
                task,
            },
            inbound_rx,
        )
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Resolves once the background task has exited, which after the
    /// transport is dropped means queued frames and the close frame are out.
    /// Take it before handing the transport to a session.
    pub fn closed(&self) -> impl Future<Output = ()> + 'static {
        let mut done = self.done.clone();
        async move {
            let _ = done.wait_for(|finished| *finished).await;
        }
    }
}

impl Transport for WsTransport {
    fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        self.outbound
            .send(message)
            .map_err(|_| TransportError::Closed)
    }
}

enum LinkEnd {
    /// The owner went away; stop for good.
    Shutdown,
    Lost(String),
}

async fn run_connection(
    url: String,
    reconnect_delay: Duration,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match tokio_tungstenite::connect_async(&url).await {
            Ok((stream, _)) => {
                log::info!(target: "pgd.ws", "Connected to {}", url);
                connected.store(true, Ordering::SeqCst);
                if inbound.send(TransportEvent::Connected).is_err() {
                    return;
                }
                let end = pump(stream, &mut outbound, &inbound).await;
                connected.store(false, Ordering::SeqCst);
                match end {
                    LinkEnd::Shutdown => {
                        log::info!(target: "pgd.ws", "Closed connection to {}", url);
                        return;
                    }
                    LinkEnd::Lost(reason) => {
                        log::warn!(target: "pgd.ws", "Lost connection to {}: {}", url, reason);
                        if inbound.send(TransportEvent::Disconnected).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                log::warn!(target: "pgd.ws", "Connect to {} failed: {}", url, e);
            }
        }

        if !wait_before_redial(reconnect_delay, &mut outbound).await {
            return;
        }
    }
}

/// Sleep out the redial delay, discarding anything sent meanwhile. Returns
/// false if the owner went away.
async fn wait_before_redial(
    delay: Duration,
    outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
) -> bool {
    let wake = tokio::time::sleep(delay);
    tokio::pin!(wake);
    loop {
        tokio::select! {
            _ = &mut wake => return true,
            msg = outbound.recv() => match msg {
                None => return false,
                Some(msg) => log::debug!(target: "pgd.ws", "Dropping {:?} while disconnected", msg),
            },
        }
    }
}

async fn pump(
    stream: WsStream,
    outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
    inbound: &mpsc::UnboundedSender<TransportEvent>,
) -> LinkEnd {
    let (mut ws_tx, mut ws_rx) = stream.split();

    loop {
        tokio::select! {
            msg = outbound.recv() => {
                let Some(msg) = msg else {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return LinkEnd::Shutdown;
                };
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        log::error!(target: "pgd.ws", "Failed to encode {:?}: {}", msg, e);
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    return LinkEnd::Lost(e.to_string());
                }
            }
            frame = ws_rx.next() => {
                let msg = match frame {
                    None => return LinkEnd::Lost("stream ended".to_string()),
                    Some(Err(e)) => return LinkEnd::Lost(e.to_string()),
                    Some(Ok(msg)) => msg,
                };
                match msg {
                    Message::Text(text) => match serde_json::from_str::<BoardEvent>(&text) {
                        Ok(event) => {
                            if inbound.send(TransportEvent::Event(event)).is_err() {
                                let _ = ws_tx.send(Message::Close(None)).await;
                                return LinkEnd::Shutdown;
                            }
                        }
                        Err(e) => {
                            log::warn!(target: "pgd.ws", "Skipping unparsable frame: {}", e);
                        }
                    },
                    Message::Ping(data) => {
                        if let Err(e) = ws_tx.send(Message::Pong(data)).await {
                            return LinkEnd::Lost(e.to_string());
                        }
                    }
                    Message::Close(_) => return LinkEnd::Lost("closed by server".to_string()),
                    _ => {}
                }
            }
        }
    }
}
