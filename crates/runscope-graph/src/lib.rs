//! Runscope Graph - per-stage search tree layout and multi-stage merge
//!
//! Each pipeline stage produces an independent search tree (a DAG of
//! experiment nodes). This crate:
//! - lays out one stage's tree with a layered (Sugiyama-style) algorithm
//!   behind a replaceable [`LayoutEngine`] trait
//! - classifies nodes from structural position and flags
//! - merges N laid-out per-stage trees into one vertically-zoned tree
//!   with a contiguous global id space
//!
//! Everything here is deterministic for a fixed input: sort keys are
//! explicit and nothing depends on map iteration order or wall-clock.

pub mod classify;
pub mod error;
pub mod layout;
pub mod merge;
pub mod tree;

pub use classify::*;
pub use error::*;
pub use layout::*;
pub use merge::*;
pub use tree::*;
