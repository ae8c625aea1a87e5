//! Multi-stage tree merge: N laid-out per-stage trees become one
//! vertically-zoned merged tree.
//!
//! Stages are ordered by ascending numeric sequence prefix. Each stage
//! occupies a disjoint vertical zone proportional to its own layout
//! height, with a fixed gap between adjacent zones. Within a zone a
//! stage's y is rescaled linearly from its own [min_y, max_y] into the
//! zone; x is unchanged. Node ids are renumbered into one contiguous
//! global space with `(stage_id, original_id)` retained for
//! back-reference. Edges stay stage-local: the merge never synthesizes
//! cross-stage edges — stage boundaries are separator metadata only.

use serde::{Deserialize, Serialize};
use tracing::warn;

use runscope_protocol::stage_sequence;

use crate::classify::{classify, NodeType};
use crate::error::GraphError;
use crate::tree::{NodeFlags, StageTree};

/// Tunable visual-proportion parameters. None of these carry
/// correctness weight beyond the non-overlap invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Fixed vertical gap between adjacent stage zones.
    pub zone_gap: f64,
    /// Lower clamp on a zone's height so tiny trees stay visible.
    pub min_zone_height: f64,
    /// Scale applied to each stage's own layout height.
    pub height_scale: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            zone_gap: 0.08,
            min_zone_height: 0.15,
            height_scale: 1.0,
        }
    }
}

/// A node of the merged tree, carrying its stage-local identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedNode {
    /// Contiguous global id in the merged id space.
    pub id: u32,
    pub stage_id: String,
    pub original_id: u32,
    pub x: f64,
    pub y: f64,
    pub node_type: NodeType,
    pub flags: NodeFlags,
    pub payload: serde_json::Value,
}

/// An edge in the merged global id space. Always intra-stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedEdge {
    pub source: u32,
    pub target: u32,
}

/// One stage's vertical zone in the merged Y axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneMetadata {
    pub stage_id: String,
    pub min: f64,
    pub max: f64,
}

/// Union of all stages' trees under one contiguous id space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MergedTree {
    pub nodes: Vec<MergedNode>,
    pub edges: Vec<MergedEdge>,
    /// One entry per merged stage, sorted by stage sequence, zones
    /// disjoint and separated by the configured gap.
    pub zone_metadata: Vec<ZoneMetadata>,
}

impl MergedTree {
    /// Recover a merged node from its stage-local identity.
    pub fn find(&self, stage_id: &str, original_id: u32) -> Option<&MergedNode> {
        self.nodes
            .iter()
            .find(|n| n.stage_id == stage_id && n.original_id == original_id)
    }

    /// The backend-selected top candidate for a stage, if any.
    pub fn best_node_for_stage(&self, stage_id: &str) -> Option<&MergedNode> {
        self.nodes
            .iter()
            .find(|n| n.stage_id == stage_id && n.flags.is_best)
    }
}

/// Merge an ordered list of laid-out per-stage trees.
///
/// Deterministic: explicit sort by `(sequence, stage_id)`, node order
/// preserved within a stage, no map iteration, no wall-clock. Merging
/// the same input twice yields identical output. Stages with no nodes
/// and edges with dangling endpoints are skipped (warn-logged); a stage
/// with duplicate node ids is a malformed snapshot and fails the whole
/// merge, since global ids could otherwise alias.
pub fn merge_stage_trees(
    stages: &[StageTree],
    config: &MergeConfig,
) -> Result<MergedTree, GraphError> {
    for stage in stages {
        stage.validate()?;
    }
    let mut ordered: Vec<&StageTree> = stages.iter().filter(|s| !s.nodes.is_empty()).collect();
    ordered.sort_by(|a, b| {
        let ka = (stage_sequence(&a.stage_id).unwrap_or(u32::MAX), &a.stage_id);
        let kb = (stage_sequence(&b.stage_id).unwrap_or(u32::MAX), &b.stage_id);
        ka.cmp(&kb)
    });

    let mut merged = MergedTree::default();
    let mut cursor = 0.0f64;
    let mut next_id = 0u32;

    for stage in ordered {
        let min_y = stage.nodes.iter().map(|n| n.y).fold(f64::MAX, f64::min);
        let max_y = stage.nodes.iter().map(|n| n.y).fold(f64::MIN, f64::max);
        let span = max_y - min_y;
        let height = (span * config.height_scale).max(config.min_zone_height);

        let zone_min = cursor;
        let zone_max = cursor + height;

        let base_id = next_id;
        for node in &stage.nodes {
            let y = if span > 0.0 {
                zone_min + (node.y - min_y) / span * height
            } else {
                (zone_min + zone_max) / 2.0
            };
            merged.nodes.push(MergedNode {
                id: next_id,
                stage_id: stage.stage_id.clone(),
                original_id: node.id,
                x: node.x,
                y,
                node_type: classify(node.id, &stage.nodes, &stage.edges),
                flags: node.flags.clone(),
                payload: node.payload.clone(),
            });
            next_id += 1;
        }

        let global_id = |local: u32| -> Option<u32> {
            stage
                .nodes
                .iter()
                .position(|n| n.id == local)
                .map(|idx| base_id + idx as u32)
        };
        for edge in &stage.edges {
            match (global_id(edge.source), global_id(edge.target)) {
                (Some(source), Some(target)) => {
                    merged.edges.push(MergedEdge { source, target });
                }
                _ => {
                    warn!(
                        stage_id = %stage.stage_id,
                        source = edge.source,
                        target = edge.target,
                        "edge references missing node, skipped"
                    );
                }
            }
        }

        merged.zone_metadata.push(ZoneMetadata {
            stage_id: stage.stage_id.clone(),
            min: zone_min,
            max: zone_max,
        });
        cursor = zone_max + config.zone_gap;
    }

    Ok(merged)
}

// NodeType is derived state; serialize it by display name so snapshot
// dumps stay readable.
impl Serialize for NodeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "root" => Ok(Self::Root),
            "failed" => Ok(Self::Failed),
            "seed_aggregate" => Ok(Self::SeedAggregate),
            "seed_evaluation" => Ok(Self::SeedEvaluation),
            "ablation" => Ok(Self::Ablation),
            "hyperparameter" => Ok(Self::Hyperparameter),
            "best" => Ok(Self::Best),
            "normal" => Ok(Self::Normal),
            other => Err(serde::de::Error::custom(format!("unknown node type: {other}"))),
        }
    }
}
