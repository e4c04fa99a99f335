pub mod board;
pub mod channel;
pub mod events;
pub mod hub;
pub mod lanes;
pub mod partition;
pub mod reconcile;
pub mod session;
pub mod sync;
pub mod types;

pub use board::{BoardState, MoveIntent};
pub use channel::{ConnectionState, Dispatch, SyncChannel};
pub use events::BoardEvent;
pub use lanes::{LaneError, LaneSet};
pub use partition::{partition, Partition};
pub use reconcile::{reconcile, MoveDescriptor, Position};
pub use session::{BoardSession, SessionUpdate};
pub use sync::{ClientMessage, Transport, TransportError, TransportEvent};
pub use types::{Lane, Task, TaskId, TaskPatch};
