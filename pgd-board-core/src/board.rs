/// Local, presentation-ready state of one board.
///
/// Owns the board's task collection exclusively. All mutations go through
/// the reconciler or the event applier, so lane `orden` values stay dense.
use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::events::{apply_event, BoardEvent};
use crate::lanes::LaneSet;
use crate::partition::{partition, Partition};
use crate::reconcile::{reconcile, MoveDescriptor, Position};
use crate::types::{Task, TaskId};

/// A move already applied locally, to be sent upstream and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub board_id: String,
    pub task_id: TaskId,
    pub from_state: String,
    pub to_state: String,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct BoardState {
    board_id: String,
    lanes: LaneSet,
    tasks: Vec<Task>,
}

impl BoardState {
    pub fn new(board_id: impl Into<String>, lanes: LaneSet) -> Self {
        Self {
            board_id: board_id.into(),
            lanes,
            tasks: Vec::new(),
        }
    }

    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    pub fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Replace local state with an authoritative snapshot.
    pub fn replace_snapshot(&mut self, tasks: Vec<Task>) {
        let unknown = tasks
            .iter()
            .filter(|t| !self.lanes.contains(&t.status))
            .count();
        if unknown > 0 {
            log::warn!(
                target: "pgd.board",
                "Snapshot for board {} has {} task(s) outside the lane set",
                self.board_id,
                unknown
            );
        }
        log::debug!(
            target: "pgd.board",
            "Loaded snapshot for board {} ({} tasks)",
            self.board_id,
            tasks.len()
        );
        self.tasks = tasks;
    }

    pub fn view(&self) -> Partition<'_> {
        partition(&self.tasks, &self.lanes)
    }

    /// Apply a drag-and-drop result. Returns the intent when something moved.
    pub fn apply_drag(&mut self, mv: &MoveDescriptor) -> Option<MoveIntent> {
        let destination = mv.destination.as_ref()?;
        if !self.lanes.contains(&destination.lane) {
            log::debug!(
                target: "pgd.board",
                "Ignoring drop of task {} on unknown lane {:?}",
                mv.task_id,
                destination.lane
            );
            return None;
        }
        let next = match reconcile(&self.tasks, mv) {
            Cow::Borrowed(_) => return None,
            Cow::Owned(next) => next,
        };
        self.tasks = next;

        let (to_state, index) = self
            .view()
            .position_of(mv.task_id)
            .map(|(lane, index)| (lane.to_string(), index))?;
        Some(MoveIntent {
            board_id: self.board_id.clone(),
            task_id: mv.task_id,
            from_state: mv.source.lane.clone(),
            to_state,
            index,
        })
    }

    /// Move a task to `to_lane` at `to_index`, locating its current slot.
    pub fn move_task(&mut self, task_id: TaskId, to_lane: &str, to_index: usize) -> Option<MoveIntent> {
        let (lane, index) = self.view().position_of(task_id)?;
        let source = Position::new(lane, index);
        let mv = MoveDescriptor::new(task_id, source, Some(Position::new(to_lane, to_index)));
        self.apply_drag(&mv)
    }

    /// Apply an inbound event scoped to this board. Returns whether state changed.
    pub fn apply_event(&mut self, event: &BoardEvent) -> bool {
        apply_event(&mut self.tasks, &self.board_id, event)
    }

    pub fn overdue(&self, today: NaiveDate) -> Vec<&Task> {
        let final_lane = self.lanes.final_lane().map(|l| l.id.as_str());
        self.tasks
            .iter()
            .filter(|t| self.lanes.contains(&t.status) && t.is_overdue(today, final_lane))
            .collect()
    }
}
