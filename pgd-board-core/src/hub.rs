/// In-process transport: board rooms of peers sharing one hub.
///
/// A peer's `move-task` is rebroadcast as `task-moved` to every other
/// connected peer in the same room. Server-side events are pushed with
/// [`LocalHub::publish`]. Peers can be disconnected and reconnected to
/// exercise the channel's connection handling.
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::events::BoardEvent;
use crate::sync::{ClientMessage, Transport, TransportError, TransportEvent};

struct Peer {
    tx: mpsc::UnboundedSender<TransportEvent>,
    rooms: BTreeSet<String>,
    connected: bool,
}

#[derive(Default)]
struct HubState {
    peers: HashMap<u64, Peer>,
    next_peer_id: u64,
}

impl HubState {
    /// Deliver to every connected peer in `board_id`'s room except `exclude`.
    fn broadcast(&self, board_id: &str, exclude: Option<u64>, event: &BoardEvent) -> usize {
        let mut delivered = 0;
        for (&peer_id, peer) in &self.peers {
            if Some(peer_id) == exclude || !peer.connected || !peer.rooms.contains(board_id) {
                continue;
            }
            if peer.tx.send(TransportEvent::Event(event.clone())).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

#[derive(Clone, Default)]
pub struct LocalHub {
    state: Arc<Mutex<HubState>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new connected peer. Its receiver starts with `Connected`.
    pub fn connect(&self) -> (HubTransport, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TransportEvent::Connected);
        let mut state = self.state();
        state.next_peer_id += 1;
        let peer_id = state.next_peer_id;
        state.peers.insert(
            peer_id,
            Peer {
                tx,
                rooms: BTreeSet::new(),
                connected: true,
            },
        );
        log::debug!(target: "pgd.hub", "Peer {} connected", peer_id);
        (
            HubTransport {
                peer_id,
                hub: self.clone(),
            },
            rx,
        )
    }

    /// Push a server-side event to the event's room. Returns the number of
    /// peers it reached.
    pub fn publish(&self, event: BoardEvent) -> usize {
        self.state().broadcast(event.board_id(), None, &event)
    }

    /// Drop a peer's link. Room memberships are forgotten, as a server would.
    pub fn disconnect_peer(&self, peer_id: u64) {
        if let Some(peer) = self.state().peers.get_mut(&peer_id) {
            if peer.connected {
                peer.connected = false;
                peer.rooms.clear();
                let _ = peer.tx.send(TransportEvent::Disconnected);
                log::debug!(target: "pgd.hub", "Peer {} disconnected", peer_id);
            }
        }
    }

    pub fn reconnect_peer(&self, peer_id: u64) {
        if let Some(peer) = self.state().peers.get_mut(&peer_id) {
            if !peer.connected {
                peer.connected = true;
                let _ = peer.tx.send(TransportEvent::Connected);
                log::debug!(target: "pgd.hub", "Peer {} reconnected", peer_id);
            }
        }
    }

    /// Connected peers currently in a board's room.
    pub fn room_size(&self, board_id: &str) -> usize {
        self.state()
            .peers
            .values()
            .filter(|p| p.connected && p.rooms.contains(board_id))
            .count()
    }
}

/// One peer's handle on a [`LocalHub`]. Dropping it removes the peer.
pub struct HubTransport {
    peer_id: u64,
    hub: LocalHub,
}

impl HubTransport {
    pub fn peer_id(&self) -> u64 {
        self.peer_id
    }
}

impl Transport for HubTransport {
    fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        let mut state = self.hub.state();
        let peer = state
            .peers
            .get_mut(&self.peer_id)
            .ok_or(TransportError::Closed)?;
        if !peer.connected {
            return Err(TransportError::Disconnected);
        }
        match message {
            ClientMessage::JoinBoard { board_id } => {
                peer.rooms.insert(board_id);
            }
            ClientMessage::LeaveBoard { board_id } => {
                peer.rooms.remove(&board_id);
            }
            ClientMessage::MoveTask {
                board_id,
                task_id,
                from_state,
                to_state,
                orden,
            } => {
                if !peer.rooms.contains(&board_id) {
                    log::debug!(
                        target: "pgd.hub",
                        "Peer {} moved task {} on unjoined board {}",
                        self.peer_id,
                        task_id,
                        board_id
                    );
                    return Ok(());
                }
                let event = BoardEvent::TaskMoved {
                    board_id,
                    task_id,
                    from_state,
                    to_state,
                    orden,
                };
                state.broadcast(event.board_id(), Some(self.peer_id), &event);
            }
        }
        Ok(())
    }
}

impl Drop for HubTransport {
    fn drop(&mut self) {
        self.hub.state().peers.remove(&self.peer_id);
    }
}
