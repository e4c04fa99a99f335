/// A board view wired to a sync channel.
///
/// Moves are applied locally first and then emitted. Inbound deliveries go
/// through the channel (room filtering, connection flag) and then through the
/// board (board-id filtering, idempotent apply). Dropping the session leaves
/// the board's room.
use tokio::sync::mpsc;

use crate::board::{BoardState, MoveIntent};
use crate::channel::{ConnectionState, Dispatch, SyncChannel};
use crate::partition::Partition;
use crate::reconcile::MoveDescriptor;
use crate::sync::{Transport, TransportEvent};
use crate::types::{Task, TaskId};

/// What a delivery did to the session, for the caller's UI policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    /// An inbound event changed local tasks.
    Applied,
    /// Delivery had no effect on local state.
    Ignored,
    ConnectionChanged { connected: bool },
    /// Reconnected after a drop; fetch a fresh snapshot and call
    /// [`BoardSession::replace_snapshot`].
    ResyncRequired,
}

pub struct BoardSession<T: Transport> {
    board: BoardState,
    channel: SyncChannel<T>,
}

impl<T: Transport> BoardSession<T> {
    /// Take ownership of `board` and join its room.
    pub fn open(board: BoardState, transport: T, connection: ConnectionState) -> Self {
        let mut channel = SyncChannel::new(transport, connection);
        channel.join(board.board_id());
        log::info!(target: "pgd.board", "Opened board session {}", board.board_id());
        Self { board, channel }
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn view(&self) -> Partition<'_> {
        self.board.view()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn connection(&self) -> &ConnectionState {
        self.channel.connection()
    }

    pub fn replace_snapshot(&mut self, tasks: Vec<Task>) {
        self.board.replace_snapshot(tasks);
    }

    /// UI entry point: move a task and emit the intent. The local change
    /// stands whether or not the emit goes out.
    pub fn move_task(&mut self, task_id: TaskId, to_lane: &str, to_index: usize) -> Option<MoveIntent> {
        let intent = self.board.move_task(task_id, to_lane, to_index)?;
        self.emit(&intent);
        Some(intent)
    }

    /// Drag-and-drop adapter entry point.
    pub fn apply_drag(&mut self, mv: &MoveDescriptor) -> Option<MoveIntent> {
        let intent = self.board.apply_drag(mv)?;
        self.emit(&intent);
        Some(intent)
    }

    pub fn handle(&mut self, event: TransportEvent) -> SessionUpdate {
        match self.channel.handle(event) {
            Dispatch::Connected { resumed: true } => SessionUpdate::ResyncRequired,
            Dispatch::Connected { resumed: false } => {
                SessionUpdate::ConnectionChanged { connected: true }
            }
            Dispatch::Disconnected => SessionUpdate::ConnectionChanged { connected: false },
            Dispatch::Event(event) => {
                if self.board.apply_event(&event) {
                    log::debug!(
                        target: "pgd.board",
                        "Applied {} for task {} on board {}",
                        event.kind(),
                        event.task_id(),
                        self.board.board_id()
                    );
                    SessionUpdate::Applied
                } else {
                    SessionUpdate::Ignored
                }
            }
            Dispatch::Nothing => SessionUpdate::Ignored,
        }
    }

    /// Wait for the next delivery and handle it. `None` once the transport's
    /// sender side is gone.
    pub async fn next(&mut self, rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Option<SessionUpdate> {
        let event = rx.recv().await?;
        Some(self.handle(event))
    }

    /// Handle every delivery already queued, without waiting.
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = rx.try_recv() {
            updates.push(self.handle(event));
        }
        updates
    }

    fn emit(&mut self, intent: &MoveIntent) {
        self.channel.emit_move(
            &intent.board_id,
            intent.task_id,
            &intent.from_state,
            &intent.to_state,
            Some(intent.index),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::tests::RecordingTransport;
    use crate::events::BoardEvent;
    use crate::hub::LocalHub;
    use crate::lanes::LaneSet;
    use crate::sync::ClientMessage;

    fn board(id: &str, tasks: Vec<Task>) -> BoardState {
        let mut state = BoardState::new(id, LaneSet::from_ids(["To do", "Doing", "Done"]).unwrap());
        state.replace_snapshot(tasks);
        state
    }

    fn snapshot() -> Vec<Task> {
        vec![
            Task::new(1, "a", "To do").with_order(0),
            Task::new(2, "b", "To do").with_order(1),
        ]
    }

    #[test]
    fn test_open_joins_and_move_emits() {
        let transport = RecordingTransport::default();
        let mut session =
            BoardSession::open(board("7", snapshot()), transport.clone(), ConnectionState::default());
        assert!(transport.sent().is_empty());
        assert_eq!(
            session.handle(TransportEvent::Connected),
            SessionUpdate::ConnectionChanged { connected: true }
        );
        session.move_task(2, "Done", 0).unwrap();

        assert_eq!(
            transport.sent(),
            vec![
                ClientMessage::JoinBoard {
                    board_id: "7".to_string()
                },
                ClientMessage::MoveTask {
                    board_id: "7".to_string(),
                    task_id: 2,
                    from_state: "To do".to_string(),
                    to_state: "Done".to_string(),
                    orden: Some(0),
                },
            ]
        );
    }

    #[test]
    fn test_optimistic_move_kept_while_disconnected() {
        let transport = RecordingTransport::default();
        let mut session =
            BoardSession::open(board("7", snapshot()), transport.clone(), ConnectionState::new(false));
        assert!(session.move_task(1, "Doing", 0).is_some());
        assert_eq!(session.view().lane_ids("Doing"), vec![1]);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_inbound_move_for_unknown_task_is_ignored() {
        let transport = RecordingTransport::default();
        let mut session =
            BoardSession::open(board("7", snapshot()), transport, ConnectionState::new(true));
        let before = session.board().tasks().to_vec();
        let update = session.handle(TransportEvent::Event(BoardEvent::TaskMoved {
            board_id: "7".to_string(),
            task_id: 99,
            from_state: "To do".to_string(),
            to_state: "Done".to_string(),
            orden: None,
        }));
        assert_eq!(update, SessionUpdate::Ignored);
        assert_eq!(session.board().tasks(), before.as_slice());
    }

    #[test]
    fn test_two_clients_converge_through_hub() {
        let hub = LocalHub::new();
        let (ta, mut rx_a) = hub.connect();
        let (tb, mut rx_b) = hub.connect();
        let mut a = BoardSession::open(board("7", snapshot()), ta, ConnectionState::default());
        let mut b = BoardSession::open(board("7", snapshot()), tb, ConnectionState::default());

        assert_eq!(a.drain(&mut rx_a), vec![SessionUpdate::ConnectionChanged { connected: true }]);
        assert_eq!(b.drain(&mut rx_b), vec![SessionUpdate::ConnectionChanged { connected: true }]);
        assert_eq!(hub.room_size("7"), 2);

        a.move_task(2, "Done", 0).unwrap();
        assert_eq!(b.drain(&mut rx_b), vec![SessionUpdate::Applied]);
        assert!(rx_a.try_recv().is_err());

        assert_eq!(a.view().lane_ids("Done"), b.view().lane_ids("Done"));
        assert_eq!(a.view().lane_ids("To do"), b.view().lane_ids("To do"));
        assert_eq!(b.board().task(2).unwrap().status, "Done");
    }

    #[test]
    fn test_server_events_for_other_board_ignored() {
        let hub = LocalHub::new();
        let (ta, mut rx_a) = hub.connect();
        let (tb, mut rx_b) = hub.connect();
        let mut a = BoardSession::open(board("7", snapshot()), ta, ConnectionState::default());
        let mut b = BoardSession::open(board("8", Vec::new()), tb, ConnectionState::default());
        a.drain(&mut rx_a);
        b.drain(&mut rx_b);

        hub.publish(BoardEvent::TaskCreated {
            board_id: "8".to_string(),
            task: Task::new(3, "c", "To do"),
        });
        assert!(a.drain(&mut rx_a).is_empty());
        assert_eq!(b.drain(&mut rx_b), vec![SessionUpdate::Applied]);
        assert_eq!(a.board().tasks().len(), 2);
    }

    #[test]
    fn test_sessions_sharing_connection_flag_each_join() {
        let hub = LocalHub::new();
        let connection = ConnectionState::default();
        let (ta, mut rx_a) = hub.connect();
        let (tb, mut rx_b) = hub.connect();
        let mut a = BoardSession::open(board("7", snapshot()), ta, connection.clone());
        let mut b = BoardSession::open(board("8", Vec::new()), tb, connection.clone());

        assert_eq!(a.drain(&mut rx_a), vec![SessionUpdate::ConnectionChanged { connected: true }]);
        assert_eq!(b.drain(&mut rx_b), vec![SessionUpdate::ConnectionChanged { connected: true }]);
        assert!(connection.is_connected());
        assert_eq!(hub.room_size("7"), 1);
        assert_eq!(hub.room_size("8"), 1);

        let reached = hub.publish(BoardEvent::TaskCreated {
            board_id: "8".to_string(),
            task: Task::new(3, "c", "To do"),
        });
        assert_eq!(reached, 1);
        assert_eq!(b.drain(&mut rx_b), vec![SessionUpdate::Applied]);
    }

    #[test]
    fn test_preset_connected_flag_still_joins_when_link_comes_up() {
        let hub = LocalHub::new();
        let (ta, mut rx) = hub.connect();
        let peer = ta.peer_id();
        hub.disconnect_peer(peer);
        let mut session = BoardSession::open(board("7", snapshot()), ta, ConnectionState::new(true));
        assert!(!session.is_connected());

        session.drain(&mut rx);
        assert!(!session.is_connected());
        assert_eq!(hub.room_size("7"), 0);

        hub.reconnect_peer(peer);
        assert_eq!(session.drain(&mut rx), vec![SessionUpdate::ResyncRequired]);
        assert!(session.is_connected());
        assert_eq!(hub.room_size("7"), 1);
    }

    #[test]
    fn test_reconnect_requests_resync_and_rejoins() {
        let hub = LocalHub::new();
        let (ta, mut rx) = hub.connect();
        let peer = ta.peer_id();
        let mut session = BoardSession::open(board("7", snapshot()), ta, ConnectionState::default());
        session.drain(&mut rx);

        hub.disconnect_peer(peer);
        assert_eq!(
            session.drain(&mut rx),
            vec![SessionUpdate::ConnectionChanged { connected: false }]
        );
        assert!(!session.is_connected());
        assert_eq!(hub.room_size("7"), 0);

        hub.reconnect_peer(peer);
        assert_eq!(session.drain(&mut rx), vec![SessionUpdate::ResyncRequired]);
        assert_eq!(hub.room_size("7"), 1);
    }

    #[test]
    fn test_drop_leaves_room() {
        let hub = LocalHub::new();
        let (observer, _rx_o) = hub.connect();
        let (ta, mut rx) = hub.connect();
        let mut session = BoardSession::open(board("7", snapshot()), ta, ConnectionState::default());
        session.drain(&mut rx);
        assert_eq!(hub.room_size("7"), 1);
        drop(session);
        assert_eq!(hub.room_size("7"), 0);
        drop(observer);
    }
}
