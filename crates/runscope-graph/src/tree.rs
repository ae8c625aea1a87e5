use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Normalized 2D position in [0, 1]².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Semantic flags attached to a tree node by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFlags {
    /// Exception type when the node's experiment crashed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exc_type: Option<String>,
    #[serde(default)]
    pub is_best: bool,
    #[serde(default)]
    pub is_seed_node: bool,
    #[serde(default)]
    pub is_seed_agg_node: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ablation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperparam_name: Option<String>,
}

/// One experiment node in a stage's search tree.
///
/// `(x, y)` is the stage-local normalized layout position. The payload
/// (code, plan, analysis, metrics) is opaque to the graph algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub flags: NodeFlags,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl TreeNode {
    pub fn new(id: u32, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            flags: NodeFlags::default(),
            payload: serde_json::Value::Null,
        }
    }
}

/// A directed edge between two nodes of the same stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEdge {
    pub source: u32,
    pub target: u32,
}

impl TreeEdge {
    pub fn new(source: u32, target: u32) -> Self {
        Self { source, target }
    }
}

/// One stage's tree snapshot as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTree {
    pub stage_id: String,
    pub nodes: Vec<TreeNode>,
    pub edges: Vec<TreeEdge>,
}

impl StageTree {
    pub fn new(stage_id: &str) -> Self {
        Self {
            stage_id: stage_id.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Check the snapshot invariant: node ids are unique within the
    /// stage. The merge runs this on every input stage before
    /// combining. Dangling edges are tolerated downstream (skipped per
    /// edge), so they are not an error here.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(GraphError::DuplicateNodeId {
                    stage_id: self.stage_id.clone(),
                    node_id: node.id,
                });
            }
        }
        Ok(())
    }

    pub fn node(&self, id: u32) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
