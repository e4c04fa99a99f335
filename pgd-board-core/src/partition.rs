/// Board partitioner.
///
/// Groups a flat task collection into per-lane sequences, in lane definition
/// order. Each lane is sorted ascending by `orden` (missing = 0) with ties kept
/// in collection order. Tasks whose `estado` matches no lane are left out.
use crate::lanes::LaneSet;
use crate::types::{Lane, Task, TaskId};

/// One lane of a partitioned board.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneView<'a> {
    pub lane: &'a Lane,
    pub tasks: Vec<&'a Task>,
}

impl LaneView<'_> {
    pub fn over_capacity(&self) -> bool {
        self.lane.limit.is_some_and(|limit| self.tasks.len() > limit)
    }
}

/// A lane that holds more tasks than its soft limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityWarning {
    pub lane_id: String,
    pub count: usize,
    pub limit: usize,
}

/// Read-only grouped-by-lane view of a task collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<'a> {
    lanes: Vec<LaneView<'a>>,
}

impl<'a> Partition<'a> {
    pub fn lanes(&self) -> &[LaneView<'a>] {
        &self.lanes
    }

    pub fn lane(&self, lane_id: &str) -> Option<&LaneView<'a>> {
        self.lanes.iter().find(|view| view.lane.id == lane_id)
    }

    /// Ids of one lane's tasks, in lane order. Empty for unknown lanes.
    pub fn lane_ids(&self, lane_id: &str) -> Vec<TaskId> {
        self.lane(lane_id)
            .map(|view| view.tasks.iter().map(|t| t.id).collect())
            .unwrap_or_default()
    }

    /// Lane id and index of a task, if it sits in a known lane.
    pub fn position_of(&self, task_id: TaskId) -> Option<(&'a str, usize)> {
        self.lanes.iter().find_map(|view| {
            let lane: &'a Lane = view.lane;
            view.tasks
                .iter()
                .position(|t| t.id == task_id)
                .map(|index| (lane.id.as_str(), index))
        })
    }

    /// All partitioned tasks, lane after lane.
    pub fn flatten(&self) -> Vec<Task> {
        self.lanes
            .iter()
            .flat_map(|view| view.tasks.iter().map(|t| (*t).clone()))
            .collect()
    }

    pub fn capacity_warnings(&self) -> Vec<CapacityWarning> {
        self.lanes
            .iter()
            .filter(|view| view.over_capacity())
            .filter_map(|view| {
                view.lane.limit.map(|limit| CapacityWarning {
                    lane_id: view.lane.id.clone(),
                    count: view.tasks.len(),
                    limit,
                })
            })
            .collect()
    }
}

/// Tasks of a single lane, sorted by `orden` (stable).
pub fn lane_tasks<'a>(tasks: &'a [Task], lane_id: &str) -> Vec<&'a Task> {
    let mut lane: Vec<&Task> = tasks.iter().filter(|t| t.status == lane_id).collect();
    lane.sort_by_key(|t| t.sort_key());
    lane
}

pub fn partition<'a>(tasks: &'a [Task], lanes: &'a LaneSet) -> Partition<'a> {
    let lanes = lanes
        .iter()
        .map(|lane| LaneView {
            lane,
            tasks: lane_tasks(tasks, &lane.id),
        })
        .collect();
    Partition { lanes }
}
