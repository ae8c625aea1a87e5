//! Three-phase progress derivation for a single stage.
//!
//! Each stage's search runs up to three phases in order: the primary
//! iteration budget, seed evaluation (`is_seed_node` progress updates)
//! and seed aggregation (`is_seed_agg_node` progress updates). The
//! backend abandons remaining iteration work once it commits to seed
//! evaluation or aggregation, so a phase's last observed ratio
//! under-reports true completion: any started later phase forces every
//! earlier started phase to 100%.

use runscope_protocol::{EventKind, TimelineEvent};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Progress of one phase: `current` of `total` units done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub current: u32,
    pub total: u32,
    pub in_progress: bool,
}

impl PhaseProgress {
    /// Completion ratio in [0, 1]. A zero total reads as complete.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            f64::from(self.current.min(self.total)) / f64::from(self.total)
        }
    }

    fn complete(mut self) -> Self {
        self.current = self.total;
        self.in_progress = false;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

/// The three phase trackers of one stage. A phase that never reported
/// progress stays `None` and is not shown as active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagePhases {
    pub iteration: Option<PhaseProgress>,
    pub seed: Option<PhaseProgress>,
    pub aggregation: Option<PhaseProgress>,
}

impl StagePhases {
    /// Force every phase this stage touched to 100% complete.
    pub fn complete_all(&mut self) {
        self.iteration = self.iteration.map(PhaseProgress::complete);
        self.seed = self.seed.map(PhaseProgress::complete);
        self.aggregation = self.aggregation.map(PhaseProgress::complete);
    }
}

/// Which phase a progress_update event reports on.
fn phase_of(event: &TimelineEvent) -> Phase {
    if event.is_seed_agg_node {
        Phase::Aggregation
    } else if event.is_seed_node {
        Phase::Seed
    } else {
        Phase::Iteration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Iteration,
    Seed,
    Aggregation,
}

/// Derive the three phase trackers from one stage's events.
///
/// Takes the most recent matching `progress_update` per phase. An
/// update missing `iteration`/`max_iterations` contributes nothing to
/// its phase. `stage_completed` applies the completed-stage override:
/// every touched phase reports 100%.
pub fn compute_phases(events: &[&TimelineEvent], stage_completed: bool) -> StagePhases {
    let mut phases = StagePhases::default();

    for event in events {
        if event.event_type != EventKind::ProgressUpdate {
            continue;
        }
        let progress = match (event.iteration, event.max_iterations) {
            (Some(current), Some(total)) => PhaseProgress {
                current,
                total,
                in_progress: current < total,
            },
            _ => {
                warn!(event_id = %event.id, "progress_update missing iteration fields, skipping");
                continue;
            }
        };
        match phase_of(event) {
            Phase::Iteration => phases.iteration = Some(progress),
            Phase::Seed => phases.seed = Some(progress),
            Phase::Aggregation => phases.aggregation = Some(progress),
        }
    }

    // Early-exit law: started later phases complete every earlier phase.
    if phases.aggregation.is_some() {
        phases.seed = phases.seed.map(PhaseProgress::complete);
        phases.iteration = phases.iteration.map(PhaseProgress::complete);
    }
    if phases.seed.is_some() {
        phases.iteration = phases.iteration.map(PhaseProgress::complete);
    }

    if stage_completed {
        phases.complete_all();
    }

    phases
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use runscope_protocol::EventKind;

    fn progress(id: &str, current: u32, total: u32) -> TimelineEvent {
        let mut evt = TimelineEvent::new(id, EventKind::ProgressUpdate, Utc::now());
        evt.iteration = Some(current);
        evt.max_iterations = Some(total);
        evt
    }

    #[test]
    fn test_no_events_no_phases() {
        let phases = compute_phases(&[], false);
        assert!(phases.iteration.is_none());
        assert!(phases.seed.is_none());
        assert!(phases.aggregation.is_none());
    }

    #[test]
    fn test_latest_update_wins() {
        let a = progress("p1", 2, 10);
        let b = progress("p2", 5, 10);
        let phases = compute_phases(&[&a, &b], false);
        let iter = phases.iteration.unwrap();
        assert_eq!(iter.current, 5);
        assert_eq!(iter.total, 10);
        assert!(iter.in_progress);
    }

    #[test]
    fn test_seed_phase_forces_iteration_complete() {
        let iter = progress("p1", 2, 10);
        let mut seed = progress("p2", 1, 3);
        seed.is_seed_node = true;
        let phases = compute_phases(&[&iter, &seed], false);

        let iteration = phases.iteration.unwrap();
        assert_eq!(iteration.current, 10, "iteration forced to 100%");
        assert!(!iteration.in_progress);

        let seed = phases.seed.unwrap();
        assert_eq!(seed.current, 1);
        assert!(seed.in_progress);
    }

    #[test]
    fn test_aggregation_forces_seed_and_iteration_complete() {
        let iter = progress("p1", 4, 10);
        let mut seed = progress("p2", 1, 3);
        seed.is_seed_node = true;
        let mut agg = progress("p3", 1, 2);
        agg.is_seed_agg_node = true;

        let phases = compute_phases(&[&iter, &seed, &agg], false);
        assert!(phases.iteration.unwrap().is_complete());
        assert!(phases.seed.unwrap().is_complete());
        let agg = phases.aggregation.unwrap();
        assert_eq!(agg.current, 1);
        assert_eq!(agg.total, 2);
    }

    #[test]
    fn test_completed_stage_completes_touched_phases() {
        let iter = progress("p1", 4, 10);
        let phases = compute_phases(&[&iter], true);
        assert!(phases.iteration.unwrap().is_complete());
        assert!(phases.seed.is_none(), "untouched phase stays absent");
    }

    #[test]
    fn test_malformed_update_degrades_to_absent() {
        let mut broken = TimelineEvent::new("p1", EventKind::ProgressUpdate, Utc::now());
        broken.iteration = Some(3); // max_iterations missing
        let phases = compute_phases(&[&broken], false);
        assert!(phases.iteration.is_none());
    }

    #[test]
    fn test_ratio_handles_zero_total() {
        let p = PhaseProgress { current: 0, total: 0, in_progress: false };
        assert!((p.ratio() - 1.0).abs() < 1e-10);
    }
}
