use serde::{Deserialize, Serialize};

use crate::events::TimelineEvent;

/// Overall status of a pipeline run, serialized snake_case on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Terminated,
}

impl RunStatus {
    /// Terminal runs never resume; interrupted stages are finalized.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Terminated)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
        };
        write!(f, "{s}")
    }
}

/// Full run-state snapshot carried by a `state_snapshot` SSE frame.
///
/// Its `timeline` replaces the local event list wholesale; extra fields
/// the backend may send are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Terminated.is_terminal());
    }

    #[test]
    fn test_run_state_deserializes_with_defaults() {
        let json = r#"{"run_id": "run-42"}"#;
        let state: RunState = serde_json::from_str(json).unwrap();
        assert_eq!(state.run_id, "run-42");
        assert_eq!(state.status, RunStatus::Pending);
        assert!(state.timeline.is_empty());
    }

    #[test]
    fn test_run_state_snapshot_roundtrip() {
        let json = r#"{
            "run_id": "run-7",
            "status": "running",
            "timeline": [
                {"id": "e1", "timestamp": "2025-06-01T10:00:00Z", "type": "run_started"}
            ],
            "artifacts": []
        }"#;
        let state: RunState = serde_json::from_str(json).unwrap();
        assert_eq!(state.status, RunStatus::Running);
        assert_eq!(state.timeline.len(), 1);
        assert_eq!(state.timeline[0].id, "e1");
    }
}
