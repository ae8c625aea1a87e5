//! Protocol-wide constants.

/// SSE event name carrying a full run-state snapshot.
pub const EVENT_STATE_SNAPSHOT: &str = "state_snapshot";

/// SSE event name carrying a single appended timeline event.
pub const EVENT_TIMELINE_EVENT: &str = "timeline_event";

/// Reserved pseudo-stage id for the run-level start bookend.
pub const PSEUDO_STAGE_RUN_START: &str = "run_start";

/// Reserved pseudo-stage id for the run-level end bookend.
pub const PSEUDO_STAGE_RUN_END: &str = "run_end";

/// Default maximum reconnect attempts within the recovery window.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;

/// Default sliding recovery window in seconds.
pub const DEFAULT_RECONNECT_WINDOW_SECS: u64 = 60;
