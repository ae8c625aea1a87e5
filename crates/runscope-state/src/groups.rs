//! Stage grouping: fold the ordered event list into per-stage view models.
//!
//! Grouping key is the explicit `stage` field, with the two run-level
//! bookend events mapped to reserved pseudo-stages. Every catalog stage
//! produces a group even with zero events, so the dashboard can show
//! anticipated stages before they start. Groups are always recomputed
//! from scratch; they are derived state, never persisted.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use runscope_protocol::{
    is_pseudo_stage, stage_sequence, EventKind, RunStatus, RunType, StageCatalog, TimelineEvent,
    PSEUDO_STAGE_RUN_END, PSEUDO_STAGE_RUN_START,
};
use tracing::debug;

use crate::phases::{compute_phases, StagePhases};

/// Derived status of a stage group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// A top-level displayed event with its nested sub-executions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEventView {
    pub event: TimelineEvent,
    pub sub_events: Vec<TimelineEvent>,
}

/// Per-stage view model derived from the event timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageGroup {
    pub stage_id: String,
    pub stage_name: String,
    pub status: StageStatus,
    /// Top-level events with sub-executions nested, transitions removed.
    pub events: Vec<StageEventView>,
    /// Extracted `stage_transition` events, surfaced separately.
    pub transitions: Vec<TimelineEvent>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub phases: StagePhases,
}

impl StageGroup {
    pub fn is_pseudo(&self) -> bool {
        is_pseudo_stage(&self.stage_id)
    }
}

/// Grouping key for one event: pseudo-stage for the run bookends,
/// otherwise the explicit stage field.
fn stage_key(event: &TimelineEvent) -> Option<&str> {
    match event.event_type {
        EventKind::RunStarted => Some(PSEUDO_STAGE_RUN_START),
        EventKind::RunFinished => Some(PSEUDO_STAGE_RUN_END),
        _ => event.stage.as_deref(),
    }
}

/// Pure fold: `events -> Vec<StageGroup>`.
///
/// The returned list is ordered: run-start pseudo-stage, catalog stages
/// in catalog order, any uncataloged stages seen in the events (sorted
/// by numeric sequence then id), run-end pseudo-stage. Apply
/// [`finalize_interrupted`] afterwards when the run status is terminal.
pub fn group_stages(events: &[TimelineEvent], catalog: &StageCatalog) -> Vec<StageGroup> {
    let mut buckets: HashMap<&str, Vec<&TimelineEvent>> = HashMap::new();
    for event in events {
        match stage_key(event) {
            Some(key) => buckets.entry(key).or_default().push(event),
            None => {
                debug!(event_id = %event.id, "event has no stage, excluded from grouping");
            }
        }
    }

    // Explicit ordering so output never depends on map iteration order.
    let mut order: Vec<String> = Vec::with_capacity(buckets.len() + 2);
    order.push(PSEUDO_STAGE_RUN_START.to_string());
    for stage in catalog.stages() {
        order.push(stage.id.clone());
    }
    let mut extras: Vec<&str> = buckets
        .keys()
        .copied()
        .filter(|k| !is_pseudo_stage(k) && !catalog.contains(k))
        .collect();
    extras.sort_by_key(|id| (stage_sequence(id).unwrap_or(u32::MAX), id.to_string()));
    order.extend(extras.into_iter().map(String::from));
    order.push(PSEUDO_STAGE_RUN_END.to_string());

    order
        .into_iter()
        .map(|stage_id| {
            let stage_events = buckets.get(stage_id.as_str()).cloned().unwrap_or_default();
            build_group(stage_id, &stage_events, catalog)
        })
        .collect()
}

fn build_group(
    stage_id: String,
    stage_events: &[&TimelineEvent],
    catalog: &StageCatalog,
) -> StageGroup {
    let status = derive_status(&stage_id, stage_events);
    let start_time = stage_events.iter().map(|e| e.timestamp).min();
    let end_time = stage_events.iter().map(|e| e.timestamp).max();

    let mut transitions = Vec::new();
    let mut views: Vec<StageEventView> = Vec::new();
    let mut sub_events: Vec<&TimelineEvent> = Vec::new();

    for event in stage_events {
        if event.event_type == EventKind::StageTransition {
            transitions.push((*event).clone());
        } else if event.is_top_level_execution() {
            views.push(StageEventView {
                event: (*event).clone(),
                sub_events: Vec::new(),
            });
        } else {
            sub_events.push(event);
        }
    }

    // Attach sub-executions to the codex execution sharing their
    // execution_id. Id-matched, not positional: a sub event arriving
    // before its parent still nests correctly. Orphans are promoted to
    // top-level rather than dropped.
    for sub in sub_events {
        let parent = sub.execution_id.as_deref().and_then(|exec_id| {
            views.iter_mut().find(|v| {
                v.event.run_type == Some(RunType::CodexExecution)
                    && v.event.execution_id.as_deref() == Some(exec_id)
            })
        });
        match parent {
            Some(view) => view.sub_events.push(sub.clone()),
            None => {
                debug!(event_id = %sub.id, "sub-execution without codex parent, kept top-level");
                views.push(StageEventView {
                    event: sub.clone(),
                    sub_events: Vec::new(),
                });
            }
        }
    }

    let phases = compute_phases(stage_events, status == StageStatus::Completed);

    StageGroup {
        stage_name: catalog.display_name(&stage_id),
        stage_id,
        status,
        events: views,
        transitions,
        start_time,
        end_time,
        phases,
    }
}

fn derive_status(stage_id: &str, stage_events: &[&TimelineEvent]) -> StageStatus {
    if is_pseudo_stage(stage_id) {
        // Pseudo-stages complete the moment their single lifecycle
        // event arrives.
        return if stage_events.is_empty() {
            StageStatus::Pending
        } else {
            StageStatus::Completed
        };
    }
    if stage_events
        .iter()
        .any(|e| e.event_type == EventKind::StageCompleted)
    {
        StageStatus::Completed
    } else if stage_events
        .iter()
        .any(|e| e.event_type == EventKind::StageStarted)
    {
        StageStatus::InProgress
    } else {
        StageStatus::Pending
    }
}

/// Terminal-run post-pass: on a finished run nothing should read as
/// in-progress, so interrupted stages are reclassified completed. This
/// is an explicit second pass over the grouped result, not a branch in
/// the grouping rule.
pub fn finalize_interrupted(groups: &mut [StageGroup], run_status: RunStatus) {
    if !run_status.is_terminal() {
        return;
    }
    for group in groups {
        if group.status == StageStatus::InProgress {
            group.status = StageStatus::Completed;
            group.phases.complete_all();
        }
    }
}

/// Convenience: group and finalize in one call.
pub fn derive_stage_groups(
    events: &[TimelineEvent],
    catalog: &StageCatalog,
    run_status: RunStatus,
) -> Vec<StageGroup> {
    let mut groups = group_stages(events, catalog);
    finalize_interrupted(&mut groups, run_status);
    groups
}

/// Pipeline stages only: the bookend pseudo-stages are banners, not
/// stage cards.
pub fn pipeline_stages(groups: &[StageGroup]) -> Vec<&StageGroup> {
    groups.iter().filter(|g| !g.is_pseudo()).collect()
}
