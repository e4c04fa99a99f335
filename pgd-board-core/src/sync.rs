/// Sync protocol types shared by the channel and every transport adapter.
///
/// Protocol:
///   Client sends JoinBoard { board_id } to subscribe to a board room.
///   Client sends MoveTask { .. } after applying a move locally.
///   Server pushes BoardEvent frames (task-created/updated/moved/deleted).
///   Client sends LeaveBoard { board_id } on teardown.
///
/// Frames are JSON objects tagged by `event`, fields camelCase.
use serde::{Deserialize, Serialize};

use crate::events::BoardEvent;
use crate::types::TaskId;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    JoinBoard {
        board_id: String,
    },
    LeaveBoard {
        board_id: String,
    },
    MoveTask {
        board_id: String,
        task_id: TaskId,
        from_state: String,
        to_state: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        orden: Option<usize>,
    },
}

/// What a transport adapter delivers to the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Event(BoardEvent),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is disconnected")]
    Disconnected,

    #[error("Transport closed")]
    Closed,

    #[error("Failed to encode message: {0}")]
    Encode(String),
}

/// Outbound half of a bidirectional board event stream.
///
/// Implementations hand inbound [`TransportEvent`]s to their owner through a
/// channel returned by their constructor. `send` must not block.
pub trait Transport: Send {
    fn send(&mut self, message: ClientMessage) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, message: ClientMessage) -> Result<(), TransportError> {
        (**self).send(message)
    }
}
