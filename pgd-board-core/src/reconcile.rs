/// Drag reconciliation engine.
///
/// Given a task collection and a drag descriptor (source lane + index,
/// optional destination lane + index, moved task id), computes the collection
/// after the move:
/// - no destination, or destination == source -> input returned as-is
/// - same lane -> reorder
/// - other lane -> transfer, `estado` set to the destination lane
///
/// Every task in the source and destination lanes gets `orden` rewritten to
/// its 0-based lane position. Tasks of other lanes keep their entries and
/// their place in the collection. Affected-lane slots are refilled in new lane
/// order (source lane first, then destination lane).
use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::partition::lane_tasks;
use crate::types::{Task, TaskId};

/// A slot on the board: lane id plus index within the lane's sorted list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub lane: String,
    pub index: usize,
}

impl Position {
    pub fn new(lane: impl Into<String>, index: usize) -> Self {
        Self {
            lane: lane.into(),
            index,
        }
    }
}

/// What the drag-and-drop layer reports when a card is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDescriptor {
    pub task_id: TaskId,
    pub source: Position,
    /// `None` when the card was dropped outside any lane.
    pub destination: Option<Position>,
}

impl MoveDescriptor {
    pub fn new(task_id: TaskId, source: Position, destination: Option<Position>) -> Self {
        Self {
            task_id,
            source,
            destination,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.destination
            .as_ref()
            .map_or(true, |dest| *dest == self.source)
    }
}

/// Apply a move. Returns the input borrowed when nothing changes.
///
/// The moved task is looked up by id in the source lane; the source index is
/// only a hint. If the task is not in the source lane the move is ignored.
/// Destination indices past the end of the lane append.
pub fn reconcile<'a>(tasks: &'a [Task], mv: &MoveDescriptor) -> Cow<'a, [Task]> {
    let destination = match &mv.destination {
        Some(dest) if *dest != mv.source => dest,
        _ => return Cow::Borrowed(tasks),
    };
    let source_lane = mv.source.lane.as_str();
    let dest_lane = destination.lane.as_str();
    let same_lane = source_lane == dest_lane;

    let mut source_list: Vec<Task> = lane_tasks(tasks, source_lane).into_iter().cloned().collect();
    let Some(from) = locate(&source_list, mv.task_id, mv.source.index) else {
        log::trace!(
            target: "pgd.board",
            "Ignoring move of task {} not found in lane {:?}",
            mv.task_id,
            source_lane
        );
        return Cow::Borrowed(tasks);
    };
    let mut moved = source_list.remove(from);

    let mut dest_list: Vec<Task> = if same_lane {
        Vec::new()
    } else {
        moved.status = dest_lane.to_string();
        lane_tasks(tasks, dest_lane).into_iter().cloned().collect()
    };

    let target = if same_lane { &mut source_list } else { &mut dest_list };
    let index = destination.index.min(target.len());
    target.insert(index, moved);

    renumber(&mut source_list);
    renumber(&mut dest_list);

    let mut replacements = source_list.into_iter().chain(dest_list);
    let merged = tasks
        .iter()
        .map(|task| {
            if task.status == source_lane || task.status == dest_lane {
                replacements.next().unwrap_or_else(|| task.clone())
            } else {
                task.clone()
            }
        })
        .collect::<Vec<_>>();
    Cow::Owned(merged)
}

/// Rewrite `orden` of one lane to the dense `0..n-1` sequence of its sorted
/// order, leaving the collection's element order alone. Returns whether any
/// value changed.
pub fn normalize_lane(tasks: &mut [Task], lane_id: &str) -> bool {
    let mut members: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.status == lane_id)
        .map(|(i, _)| i)
        .collect();
    members.sort_by_key(|&i| tasks[i].sort_key());

    let mut changed = false;
    for (rank, i) in members.into_iter().enumerate() {
        let order = Some(rank as i64);
        if tasks[i].order != order {
            tasks[i].order = order;
            changed = true;
        }
    }
    changed
}

fn locate(lane: &[Task], task_id: TaskId, hint: usize) -> Option<usize> {
    match lane.get(hint) {
        Some(task) if task.id == task_id => Some(hint),
        _ => lane.iter().position(|t| t.id == task_id),
    }
}

fn renumber(lane: &mut [Task]) {
    for (index, task) in lane.iter_mut().enumerate() {
        task.order = Some(index as i64);
    }
}
