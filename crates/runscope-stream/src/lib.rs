//! Runscope Stream - SSE consumption for the run timeline
//!
//! Opens a Server-Sent-Events connection to the backend, splits the
//! byte stream into `event:`/`data:` frames, and applies the two
//! recognized frame kinds to a shared append-only event log:
//! - `state_snapshot` replaces the local timeline wholesale
//! - `timeline_event` appends idempotently by event id
//!
//! Connections are single-flight (connect cancels any prior in-flight
//! connection first) and transient failures trigger a bounded,
//! sliding-window reconnect budget instead of looping forever.

pub mod client;
pub mod error;
pub mod frame;
pub mod log;
pub mod recovery;

pub use client::*;
pub use error::*;
pub use frame::*;
pub use log::*;
pub use recovery::*;
