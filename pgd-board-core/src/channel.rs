/// Realtime sync channel: a typed wrapper over a [`Transport`].
///
/// Tracks which board rooms are joined, emits move intents, and turns raw
/// transport deliveries into dispatch results for the board layer.
///
/// - join/leave are idempotent; dropping the channel leaves every joined room
/// - rooms are re-joined on every connect transition of this channel's link
/// - the injected [`ConnectionState`] is only written, never trusted as the
///   link state, so several channels may share one flag
/// - move intents emitted while disconnected are dropped, never queued
/// - events for rooms this channel has not joined are discarded
use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::events::BoardEvent;
use crate::sync::{ClientMessage, Transport, TransportEvent};
use crate::types::TaskId;

/// Observable connection flag, injected into channels and shared with the UI.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectionState {
    pub fn new(connected: bool) -> Self {
        let (tx, _) = watch::channel(connected);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Set the flag. Returns whether it flipped.
    pub fn set(&self, connected: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        })
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Outcome of handling one transport delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Transport came up. `resumed` is set when it had been up before, so
    /// events may have been missed and a fresh snapshot is needed.
    Connected { resumed: bool },
    Disconnected,
    Event(BoardEvent),
    /// Nothing for the board layer (duplicate status, foreign room).
    Nothing,
}

pub struct SyncChannel<T: Transport> {
    transport: T,
    connection: ConnectionState,
    joined: BTreeSet<String>,
    link_up: bool,
    ever_connected: bool,
}

impl<T: Transport> SyncChannel<T> {
    /// The link counts as down until the transport reports `Connected`.
    pub fn new(transport: T, connection: ConnectionState) -> Self {
        Self {
            transport,
            connection,
            joined: BTreeSet::new(),
            link_up: false,
            ever_connected: false,
        }
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    /// Whether this channel's own transport link is up.
    pub fn is_connected(&self) -> bool {
        self.link_up
    }

    pub fn is_joined(&self, board_id: &str) -> bool {
        self.joined.contains(board_id)
    }

    pub fn joined(&self) -> impl Iterator<Item = &str> {
        self.joined.iter().map(String::as_str)
    }

    /// Subscribe to a board room. Returns false if it was already joined.
    ///
    /// Membership is kept while disconnected and sent on the next connect.
    pub fn join(&mut self, board_id: &str) -> bool {
        if !self.joined.insert(board_id.to_string()) {
            return false;
        }
        log::debug!(target: "pgd.channel", "Joining board {}", board_id);
        if self.is_connected() {
            self.send(ClientMessage::JoinBoard {
                board_id: board_id.to_string(),
            });
        }
        true
    }

    /// Unsubscribe from a board room. Returns false if it was not joined.
    pub fn leave(&mut self, board_id: &str) -> bool {
        if !self.joined.remove(board_id) {
            return false;
        }
        log::debug!(target: "pgd.channel", "Leaving board {}", board_id);
        if self.is_connected() {
            self.send(ClientMessage::LeaveBoard {
                board_id: board_id.to_string(),
            });
        }
        true
    }

    /// Send a move intent upstream. Fire-and-forget: returns whether the
    /// transport accepted it. Dropped while disconnected.
    pub fn emit_move(
        &mut self,
        board_id: &str,
        task_id: TaskId,
        from_state: &str,
        to_state: &str,
        orden: Option<usize>,
    ) -> bool {
        if !self.is_connected() {
            log::debug!(
                target: "pgd.channel",
                "Dropping move of task {} on board {}: disconnected",
                task_id,
                board_id
            );
            return false;
        }
        self.send(ClientMessage::MoveTask {
            board_id: board_id.to_string(),
            task_id,
            from_state: from_state.to_string(),
            to_state: to_state.to_string(),
            orden,
        })
    }

    pub fn handle(&mut self, event: TransportEvent) -> Dispatch {
        match event {
            TransportEvent::Connected => {
                if self.link_up {
                    return Dispatch::Nothing;
                }
                self.link_up = true;
                self.connection.set(true);
                let resumed = self.ever_connected;
                self.ever_connected = true;
                log::info!(
                    target: "pgd.channel",
                    "Connected (resumed={}, rooms={})",
                    resumed,
                    self.joined.len()
                );
                let rooms: Vec<String> = self.joined.iter().cloned().collect();
                for board_id in rooms {
                    self.send(ClientMessage::JoinBoard { board_id });
                }
                Dispatch::Connected { resumed }
            }
            TransportEvent::Disconnected => {
                if !self.link_up {
                    return Dispatch::Nothing;
                }
                self.link_up = false;
                self.connection.set(false);
                log::warn!(target: "pgd.channel", "Disconnected");
                Dispatch::Disconnected
            }
            TransportEvent::Event(event) => {
                if !self.joined.contains(event.board_id()) {
                    log::trace!(
                        target: "pgd.channel",
                        "Discarding {} for unjoined board {}",
                        event.kind(),
                        event.board_id()
                    );
                    return Dispatch::Nothing;
                }
                Dispatch::Event(event)
            }
        }
    }

    fn send(&mut self, message: ClientMessage) -> bool {
        match self.transport.send(message) {
            Ok(()) => true,
            Err(e) => {
                log::debug!(target: "pgd.channel", "Send failed: {}", e);
                false
            }
        }
    }
}

impl<T: Transport> Drop for SyncChannel<T> {
    fn drop(&mut self) {
        let rooms: Vec<String> = std::mem::take(&mut self.joined).into_iter().collect();
        if !self.is_connected() {
            return;
        }
        for board_id in rooms {
            self.send(ClientMessage::LeaveBoard { board_id });
        }
    }
}
