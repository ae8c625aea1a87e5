use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind tag of a timeline event, serialized snake_case on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStarted,
    RunFinished,
    StageStarted,
    StageCompleted,
    StageTransition,
    ProgressUpdate,
    NodeExecutionStarted,
    NodeExecutionCompleted,
    NodeResult,
    PaperGenerationStep,
}

/// How an execution event was launched by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    CodexExecution,
    RunfileExecution,
}

/// What a runfile execution was computing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    Metrics,
    Seed,
    Aggregation,
    StageGoal,
}

/// One immutable fact in the append-only run timeline.
///
/// Events arrive over SSE in arrival order (not necessarily timestamp
/// order) and are never mutated or removed. All derived dashboard state
/// is a pure function of the ordered event list.
///
/// The per-kind fields are all optional: a `progress_update` carries
/// `iteration`/`max_iterations`, an execution event carries
/// `execution_id`/`run_type`/`execution_type`, and so on. Old wire
/// forms omit the newer boolean flags, so they default to false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default)]
    pub is_seed_node: bool,
    #[serde(default)]
    pub is_seed_agg_node: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_type: Option<RunType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_type: Option<ExecutionType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
}

impl TimelineEvent {
    /// Minimal constructor used by tests and synthetic events.
    pub fn new(id: &str, event_type: EventKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            timestamp,
            event_type,
            stage: None,
            iteration: None,
            max_iterations: None,
            is_seed_node: false,
            is_seed_agg_node: false,
            execution_id: None,
            run_type: None,
            execution_type: None,
            outcome: None,
            success: None,
            status: None,
            gpu_type: None,
            transition_summary: None,
            headline: None,
        }
    }

    pub fn with_stage(mut self, stage: &str) -> Self {
        self.stage = Some(stage.to_string());
        self
    }

    /// Whether this event is a top-level execution event for display.
    ///
    /// Codex executions are always top-level. Runfile executions are
    /// top-level only when computing metrics; the rest are sub-events
    /// nested under the codex execution sharing their `execution_id`.
    pub fn is_top_level_execution(&self) -> bool {
        match self.run_type {
            Some(RunType::CodexExecution) => true,
            Some(RunType::RunfileExecution) => {
                self.execution_type == Some(ExecutionType::Metrics)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_snake_case_wire_form() {
        let json = serde_json::to_string(&EventKind::StageStarted).unwrap();
        assert_eq!(json, "\"stage_started\"");
        let kind: EventKind = serde_json::from_str("\"progress_update\"").unwrap();
        assert_eq!(kind, EventKind::ProgressUpdate);
    }

    #[test]
    fn test_event_deserializes_minimal_wire_form() {
        let json = r#"{
            "id": "evt-1",
            "timestamp": "2025-06-01T12:00:00Z",
            "type": "run_started"
        }"#;
        let evt: TimelineEvent = serde_json::from_str(json).unwrap();
        assert_eq!(evt.id, "evt-1");
        assert_eq!(evt.event_type, EventKind::RunStarted);
        assert!(evt.stage.is_none());
        assert!(!evt.is_seed_node);
        assert!(!evt.is_seed_agg_node);
    }

    #[test]
    fn test_event_tolerates_unknown_fields() {
        let json = r#"{
            "id": "evt-2",
            "timestamp": "2025-06-01T12:00:00Z",
            "type": "progress_update",
            "stage": "1_baseline",
            "iteration": 3,
            "max_iterations": 10,
            "some_future_field": {"nested": true}
        }"#;
        let evt: TimelineEvent = serde_json::from_str(json).unwrap();
        assert_eq!(evt.iteration, Some(3));
        assert_eq!(evt.max_iterations, Some(10));
    }

    #[test]
    fn test_progress_update_seed_flag_roundtrip() {
        let mut evt = TimelineEvent::new(
            "evt-3",
            EventKind::ProgressUpdate,
            "2025-06-01T12:00:00Z".parse().unwrap(),
        )
        .with_stage("2_tuning");
        evt.is_seed_node = true;
        evt.iteration = Some(1);
        evt.max_iterations = Some(3);

        let json = serde_json::to_string(&evt).unwrap();
        let restored: TimelineEvent = serde_json::from_str(&json).unwrap();
        assert!(restored.is_seed_node);
        assert!(!restored.is_seed_agg_node);
        assert_eq!(restored.stage.as_deref(), Some("2_tuning"));
    }

    #[test]
    fn test_top_level_execution_rules() {
        let ts = "2025-06-01T12:00:00Z".parse().unwrap();

        let mut codex = TimelineEvent::new("e1", EventKind::NodeExecutionStarted, ts);
        codex.run_type = Some(RunType::CodexExecution);
        assert!(codex.is_top_level_execution());

        let mut metrics = TimelineEvent::new("e2", EventKind::NodeExecutionStarted, ts);
        metrics.run_type = Some(RunType::RunfileExecution);
        metrics.execution_type = Some(ExecutionType::Metrics);
        assert!(metrics.is_top_level_execution());

        let mut seed = TimelineEvent::new("e3", EventKind::NodeExecutionStarted, ts);
        seed.run_type = Some(RunType::RunfileExecution);
        seed.execution_type = Some(ExecutionType::Seed);
        assert!(!seed.is_top_level_execution());

        let plain = TimelineEvent::new("e4", EventKind::StageStarted, ts);
        assert!(plain.is_top_level_execution());
    }
}
