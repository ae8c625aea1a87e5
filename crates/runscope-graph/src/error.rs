use thiserror::Error;

/// Errors from tree validation and merge.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node id {node_id} in stage {stage_id}")]
    DuplicateNodeId { stage_id: String, node_id: u32 },
}
