use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Task identity, unique within one board's task universe.
pub type TaskId = i64;

/// MoSCoW priority tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Must,
    Should,
    Could,
    #[serde(rename = "Won't")]
    Wont,
}

/// Task family. Changes which optional metrics are shown, never how a task moves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskKind {
    Scrum,
    #[default]
    Kanban,
}

/// Optional per-task metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    StoryPoints,
    EstimatedHours,
    Subtasks,
}

impl TaskKind {
    /// Metrics relevant to this task family, in display order.
    pub fn metrics(self) -> &'static [Metric] {
        match self {
            TaskKind::Scrum => &[Metric::StoryPoints],
            TaskKind::Kanban => &[Metric::EstimatedHours, Metric::Subtasks],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
}

/// The canonical task record. Field names on the wire follow the portal's REST
/// and event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "nombre")]
    pub title: String,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lane id. Must belong to the board's active lane set.
    #[serde(rename = "estado")]
    pub status: String,
    #[serde(rename = "prioridad", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Position within the lane. Missing is read as 0.
    #[serde(rename = "orden", default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(rename = "tipo", default)]
    pub kind: TaskKind,
    #[serde(rename = "fechaInicio", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fechaFin", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "responsables", default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<Assignee>,
    #[serde(rename = "puntosHistoria", default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    #[serde(rename = "horasEstimadas", default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(rename = "subtareas", default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<u32>,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            status: status.into(),
            priority: None,
            order: None,
            kind: TaskKind::default(),
            start_date: None,
            end_date: None,
            assignees: Vec::new(),
            story_points: None,
            estimated_hours: None,
            subtasks: None,
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    /// Sort key within a lane.
    pub fn sort_key(&self) -> i64 {
        self.order.unwrap_or(0)
    }

    /// Past its end date and not yet in the board's final lane.
    pub fn is_overdue(&self, today: NaiveDate, final_lane: Option<&str>) -> bool {
        if final_lane == Some(self.status.as_str()) {
            return false;
        }
        self.end_date.is_some_and(|end| end < today)
    }
}

/// Partial task payload of a `task-updated` event. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub id: TaskId,
    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "estado", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "prioridad", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(rename = "orden", default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(rename = "tipo", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TaskKind>,
    #[serde(rename = "fechaInicio", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(rename = "fechaFin", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "responsables", default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<Assignee>>,
    #[serde(rename = "puntosHistoria", default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    #[serde(rename = "horasEstimadas", default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(rename = "subtareas", default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<u32>,
}

impl TaskPatch {
    pub fn new(id: TaskId) -> Self {
        Self { id, ..Default::default() }
    }

    /// Whether applying this patch can change a task's lane or position.
    pub fn touches_placement(&self) -> bool {
        self.status.is_some() || self.order.is_some()
    }

    /// Shallow-merge every present field into `task`.
    pub fn merge_into(&self, task: &mut Task) {
        if let Some(v) = &self.title {
            task.title = v.clone();
        }
        if let Some(v) = &self.description {
            task.description = Some(v.clone());
        }
        if let Some(v) = &self.status {
            task.status = v.clone();
        }
        if let Some(v) = self.priority {
            task.priority = Some(v);
        }
        if let Some(v) = self.order {
            task.order = Some(v);
        }
        if let Some(v) = self.kind {
            task.kind = v;
        }
        if let Some(v) = self.start_date {
            task.start_date = Some(v);
        }
        if let Some(v) = self.end_date {
            task.end_date = Some(v);
        }
        if let Some(v) = &self.assignees {
            task.assignees = v.clone();
        }
        if let Some(v) = self.story_points {
            task.story_points = Some(v);
        }
        if let Some(v) = self.estimated_hours {
            task.estimated_hours = Some(v);
        }
        if let Some(v) = self.subtasks {
            task.subtasks = Some(v);
        }
    }
}

/// A board column, mapped 1:1 to one `estado` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: String,
    pub label: String,
    /// Soft capacity. Exceeding it is a warning, never a rejected move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Lane {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_wire_names() {
        let json = r#"{
            "id": 7,
            "nombre": "Informe trimestral",
            "estado": "In review",
            "prioridad": "Won't",
            "orden": 3,
            "tipo": "SCRUM",
            "fechaFin": "2024-03-31",
            "responsables": [{"id": 2, "nombre": "Ana"}],
            "puntosHistoria": 5
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.title, "Informe trimestral");
        assert_eq!(task.status, "In review");
        assert_eq!(task.priority, Some(Priority::Wont));
        assert_eq!(task.order, Some(3));
        assert_eq!(task.kind, TaskKind::Scrum);
        assert_eq!(task.end_date, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(task.assignees[0].name, "Ana");
        assert_eq!(task.story_points, Some(5));
        assert!(task.description.is_none());
    }

    #[test]
    fn test_task_defaults_when_fields_missing() {
        let task: Task =
            serde_json::from_str(r#"{"id": 1, "nombre": "x", "estado": "To do"}"#).unwrap();
        assert_eq!(task.order, None);
        assert_eq!(task.sort_key(), 0);
        assert_eq!(task.kind, TaskKind::Kanban);
        assert!(task.assignees.is_empty());
    }

    #[test]
    fn test_metrics_by_kind() {
        assert_eq!(TaskKind::Scrum.metrics(), &[Metric::StoryPoints]);
        assert_eq!(
            TaskKind::Kanban.metrics(),
            &[Metric::EstimatedHours, Metric::Subtasks]
        );
    }

    #[test]
    fn test_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut task = Task::new(1, "a", "In progress");
        assert!(!task.is_overdue(today, Some("Done")));

        task.end_date = NaiveDate::from_ymd_opt(2024, 5, 9);
        assert!(task.is_overdue(today, Some("Done")));

        task.status = "Done".to_string();
        assert!(!task.is_overdue(today, Some("Done")));

        task.status = "To do".to_string();
        task.end_date = Some(today);
        assert!(!task.is_overdue(today, Some("Done")));
    }

    #[test]
    fn test_patch_merges_present_fields_only() {
        let mut task = Task::new(5, "Original", "To do").with_order(2);
        task.description = Some("keep".to_string());

        let mut patch = TaskPatch::new(5);
        patch.priority = Some(Priority::Must);
        patch.merge_into(&mut task);

        assert_eq!(task.priority, Some(Priority::Must));
        assert_eq!(task.title, "Original");
        assert_eq!(task.description.as_deref(), Some("keep"));
        assert_eq!(task.order, Some(2));
        assert!(!patch.touches_placement());
    }

    #[test]
    fn test_patch_from_partial_json() {
        let patch: TaskPatch = serde_json::from_str(r#"{"id": 5, "descripcion": "x"}"#).unwrap();
        assert_eq!(patch.description.as_deref(), Some("x"));
        assert!(patch.title.is_none());
        assert!(patch.status.is_none());
    }
}
