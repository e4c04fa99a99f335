/// Validated, ordered lane definitions for one board.
///
/// Lane ids double as `estado` values, so they must be non-blank and unique.
/// A malformed set is a programmer error and is rejected when the set is built,
/// never later during a move.
use std::collections::HashSet;

use crate::types::Lane;

/// Lane ids of the portal's default board, in display order.
pub const DEFAULT_LANES: &[&str] = &["To do", "In progress", "In review", "Done"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LaneError {
    #[error("Board needs at least one lane")]
    Empty,

    #[error("Lane at position {0} has a blank id")]
    BlankId(usize),

    #[error("Duplicate lane id: {0}")]
    Duplicate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneSet {
    lanes: Vec<Lane>,
}

impl LaneSet {
    pub fn new(lanes: Vec<Lane>) -> Result<Self, LaneError> {
        if lanes.is_empty() {
            return Err(LaneError::Empty);
        }
        let mut seen = HashSet::new();
        for (index, lane) in lanes.iter().enumerate() {
            if lane.id.trim().is_empty() {
                return Err(LaneError::BlankId(index));
            }
            if !seen.insert(lane.id.as_str()) {
                return Err(LaneError::Duplicate(lane.id.clone()));
            }
        }
        Ok(Self { lanes })
    }

    /// Build a set whose labels equal their ids.
    pub fn from_ids<I, S>(ids: I) -> Result<Self, LaneError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            ids.into_iter()
                .map(|id| {
                    let id = id.into();
                    Lane::new(id.clone(), id)
                })
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Lane> {
        self.lanes.iter()
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// The last lane, treated as the "finished" state for overdue display.
    pub fn final_lane(&self) -> Option<&Lane> {
        self.lanes.last()
    }
}

impl Default for LaneSet {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES.iter().map(|id| Lane::new(*id, *id)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LaneSet {
    type Item = &'a Lane;
    type IntoIter = std::slice::Iter<'a, Lane>;

    fn into_iter(self) -> Self::IntoIter {
        self.lanes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lanes() {
        let lanes = LaneSet::default();
        assert_eq!(lanes.len(), 4);
        assert_eq!(lanes.final_lane().map(|l| l.id.as_str()), Some("Done"));
        assert!(lanes.contains("In review"));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(LaneSet::new(Vec::new()), Err(LaneError::Empty));
    }

    #[test]
    fn test_rejects_blank_id() {
        let result = LaneSet::from_ids(["To do", "  "]);
        assert_eq!(result, Err(LaneError::BlankId(1)));
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let result = LaneSet::from_ids(["To do", "Done", "To do"]);
        assert_eq!(result, Err(LaneError::Duplicate("To do".to_string())));
    }
}
