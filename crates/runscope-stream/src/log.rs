//! Shared append-only event log fed by the SSE stream.

use std::collections::HashSet;

use runscope_protocol::{
    RunState, RunStatus, TimelineEvent, EVENT_STATE_SNAPSHOT, EVENT_TIMELINE_EVENT,
};
use tracing::{debug, warn};

use crate::frame::SseFrame;

/// The local copy of the run timeline. Facts only: events are appended
/// (idempotently by id) or replaced wholesale by a snapshot, never
/// mutated in place. `revision` bumps on every effective change so
/// consumers know when to re-run the reducers.
#[derive(Debug, Default)]
pub struct EventLog {
    run_id: Option<String>,
    status: RunStatus,
    events: Vec<TimelineEvent>,
    ids: HashSet<String>,
    revision: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn run_status(&self) -> RunStatus {
        self.status
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the local timeline wholesale from a snapshot, e.g. on
    /// (re)connect.
    pub fn apply_snapshot(&mut self, state: RunState) {
        self.ids = state.timeline.iter().map(|e| e.id.clone()).collect();
        self.events = state.timeline;
        self.run_id = Some(state.run_id);
        self.status = state.status;
        self.revision += 1;
    }

    /// Append one event unless its id is already present. Returns
    /// whether the log changed.
    pub fn append_unique(&mut self, event: TimelineEvent) -> bool {
        if self.ids.contains(&event.id) {
            debug!(event_id = %event.id, "duplicate timeline event ignored");
            return false;
        }
        self.ids.insert(event.id.clone());
        self.events.push(event);
        self.revision += 1;
        true
    }

    /// Apply one parsed SSE frame. Unknown event names and unparseable
    /// JSON are absorbed locally (logged, frame dropped); the stream is
    /// never aborted because of one bad frame. Returns whether the log
    /// changed.
    pub fn apply_frame(&mut self, frame: &SseFrame) -> bool {
        match frame.event.as_str() {
            EVENT_STATE_SNAPSHOT => match serde_json::from_str::<RunState>(&frame.data) {
                Ok(state) => {
                    self.apply_snapshot(state);
                    true
                }
                Err(e) => {
                    warn!(error = %e, "unparseable state_snapshot frame dropped");
                    false
                }
            },
            EVENT_TIMELINE_EVENT => match serde_json::from_str::<TimelineEvent>(&frame.data) {
                Ok(event) => self.append_unique(event),
                Err(e) => {
                    warn!(error = %e, "unparseable timeline_event frame dropped");
                    false
                }
            },
            other => {
                debug!(event = other, "unrecognized SSE event name ignored");
                false
            }
        }
    }
}
