/// Inbound board lifecycle events and how they mutate local state.
///
/// Every event names the board it targets. Appliers scoped to another board
/// ignore it. Each kind is safe to apply when the task is unknown locally
/// (stale or late delivery) and `task-created` is idempotent under
/// redelivery.
use serde::{Deserialize, Serialize};

use crate::partition::lane_tasks;
use crate::reconcile::{normalize_lane, reconcile, MoveDescriptor, Position};
use crate::types::{Task, TaskId, TaskPatch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum BoardEvent {
    TaskCreated {
        board_id: String,
        task: Task,
    },
    TaskUpdated {
        board_id: String,
        task: TaskPatch,
    },
    TaskMoved {
        board_id: String,
        task_id: TaskId,
        from_state: String,
        to_state: String,
        /// Destination index, when the sender knows it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        orden: Option<usize>,
    },
    TaskDeleted {
        board_id: String,
        task_id: TaskId,
    },
}

impl BoardEvent {
    pub fn board_id(&self) -> &str {
        match self {
            BoardEvent::TaskCreated { board_id, .. }
            | BoardEvent::TaskUpdated { board_id, .. }
            | BoardEvent::TaskMoved { board_id, .. }
            | BoardEvent::TaskDeleted { board_id, .. } => board_id,
        }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            BoardEvent::TaskCreated { task, .. } => task.id,
            BoardEvent::TaskUpdated { task, .. } => task.id,
            BoardEvent::TaskMoved { task_id, .. } | BoardEvent::TaskDeleted { task_id, .. } => {
                *task_id
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BoardEvent::TaskCreated { .. } => "task-created",
            BoardEvent::TaskUpdated { .. } => "task-updated",
            BoardEvent::TaskMoved { .. } => "task-moved",
            BoardEvent::TaskDeleted { .. } => "task-deleted",
        }
    }
}

/// Apply one event to a board's task collection.
///
/// Returns whether the collection changed. Events for a different board and
/// events about unknown tasks are no-ops.
pub fn apply_event(tasks: &mut Vec<Task>, board_id: &str, event: &BoardEvent) -> bool {
    if event.board_id() != board_id {
        log::trace!(
            target: "pgd.board",
            "Ignoring {} for board {} (scoped to {})",
            event.kind(),
            event.board_id(),
            board_id
        );
        return false;
    }

    let changed = match event {
        BoardEvent::TaskCreated { task, .. } => apply_created(tasks, task),
        BoardEvent::TaskUpdated { task, .. } => apply_updated(tasks, task),
        BoardEvent::TaskMoved {
            task_id,
            to_state,
            orden,
            ..
        } => apply_moved(tasks, *task_id, to_state, *orden),
        BoardEvent::TaskDeleted { task_id, .. } => apply_deleted(tasks, *task_id),
    };

    if !changed {
        log::trace!(
            target: "pgd.board",
            "{} for task {} left board {} unchanged",
            event.kind(),
            event.task_id(),
            board_id
        );
    }
    changed
}

fn apply_created(tasks: &mut Vec<Task>, task: &Task) -> bool {
    if tasks.iter().any(|t| t.id == task.id) {
        return false;
    }
    tasks.push(task.clone());
    normalize_lane(tasks, &task.status);
    true
}

fn apply_updated(tasks: &mut [Task], patch: &TaskPatch) -> bool {
    let Some(task) = tasks.iter_mut().find(|t| t.id == patch.id) else {
        return false;
    };
    let before_lane = task.status.clone();
    let before = task.clone();
    patch.merge_into(task);
    let after_lane = task.status.clone();
    let changed = *task != before;

    if changed && patch.touches_placement() {
        normalize_lane(tasks, &before_lane);
        if after_lane != before_lane {
            normalize_lane(tasks, &after_lane);
        }
    }
    changed
}

fn apply_moved(tasks: &mut Vec<Task>, task_id: TaskId, to_state: &str, index: Option<usize>) -> bool {
    let Some(current) = tasks.iter().find(|t| t.id == task_id) else {
        return false;
    };
    let from_state = current.status.clone();
    let source_index = lane_tasks(tasks, &from_state)
        .iter()
        .position(|t| t.id == task_id)
        .unwrap_or(0);

    let dest_index = match index {
        Some(index) => index,
        None if from_state == to_state => return false,
        None => lane_tasks(tasks, to_state).len(),
    };

    let mv = MoveDescriptor::new(
        task_id,
        Position::new(from_state, source_index),
        Some(Position::new(to_state, dest_index)),
    );
    let next = reconcile(tasks, &mv).into_owned();
    if next == *tasks {
        return false;
    }
    *tasks = next;
    true
}

fn apply_deleted(tasks: &mut Vec<Task>, task_id: TaskId) -> bool {
    let Some(pos) = tasks.iter().position(|t| t.id == task_id) else {
        return false;
    };
    let removed = tasks.remove(pos);
    normalize_lane(tasks, &removed.status);
    true
}
