//! Runscope State - pure reducers over the append-only event timeline
//!
//! Folds the ordered timeline event list into per-stage view models:
//! - stage grouping with pending placeholders and the terminal-run
//!   finalization post-pass
//! - three-phase (iteration / seed / aggregation) progress with
//!   early-exit semantics
//! - sub-execution nesting under top-level codex executions
//!
//! All reducers are synchronous pure functions recomputed from scratch
//! on every event-list mutation; a malformed event degrades its own
//! contribution and never blanks the derived view.

pub mod groups;
pub mod phases;

pub use groups::*;
pub use phases::*;
