//! Runscope Protocol - Timeline event model and run-state types
//!
//! Defines the wire shape of the append-only timeline event stream
//! emitted by the research pipeline backend, plus the run-state
//! snapshot object and the fixed pipeline stage catalog.

pub mod constants;
pub mod events;
pub mod run;
pub mod stages;

pub use constants::*;
pub use events::*;
pub use run::*;
pub use stages::*;
