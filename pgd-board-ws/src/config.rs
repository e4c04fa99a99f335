/// Configuration for the board sync client.
/// Reads board.json from ~/.config/pgd/board.json (or platform equivalent).

use pgd_board_core::lanes::DEFAULT_LANES;
use pgd_board_core::{Lane, LaneError, LaneSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_lanes")]
    pub lanes: Vec<Lane>,
}

fn default_server_url() -> String {
    "ws://localhost:3000/sync".to_string()
}

fn default_api_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

fn default_lanes() -> Vec<Lane> {
    DEFAULT_LANES.iter().map(|id| Lane::new(*id, *id)).collect()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_url: default_api_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            lanes: default_lanes(),
        }
    }
}

impl SyncConfig {
    pub fn lane_set(&self) -> Result<LaneSet, LaneError> {
        LaneSet::new(self.lanes.clone())
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Default config path: ~/.config/pgd/board.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pgd")
        .join("board.json")
}

/// Load config from path. Returns default if file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> SyncConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!(target: "pgd.config", "Failed to parse config {}: {}", path.display(), e);
            SyncConfig::default()
        }),
        Err(_) => {
            log::info!(target: "pgd.config", "No config at {}, using defaults", path.display());
            SyncConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.json"));
        assert_eq!(config.reconnect_delay_ms, 2000);
        assert_eq!(config.lane_set().unwrap().len(), 4);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server_url": "wss://pgd.example/sync", "lanes": [
                {{"id": "Pendiente", "label": "Pendiente"}},
                {{"id": "Hecho", "label": "Hecho", "limit": 10}}
            ]}}"#
        )
        .unwrap();
        let config = load_config(file.path());
        assert_eq!(config.server_url, "wss://pgd.example/sync");
        assert_eq!(config.api_url, "http://localhost:3000/api");
        let lanes = config.lane_set().unwrap();
        assert_eq!(lanes.get("Hecho").and_then(|l| l.limit), Some(10));
    }

    #[test]
    fn test_invalid_json_gives_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let config = load_config(file.path());
        assert_eq!(config.server_url, "ws://localhost:3000/sync");
    }

    #[test]
    fn test_duplicate_lanes_rejected() {
        let config = SyncConfig {
            lanes: vec![Lane::new("A", "A"), Lane::new("A", "B")],
            ..Default::default()
        };
        assert_eq!(config.lane_set(), Err(LaneError::Duplicate("A".to_string())));
    }
}
