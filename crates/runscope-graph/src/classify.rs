//! Node classification from structural position and flags.
//!
//! Root detection runs before any flag rule: a node with zero incoming
//! edges is Root even when all its flags are false. For non-root nodes
//! the flags are evaluated in one fixed precedence, first match wins:
//! exception → seed-aggregate → seed-evaluation → ablation →
//! hyperparameter → best → normal. The same table is used by every
//! renderer so a node never changes type between views.

use crate::tree::{TreeEdge, TreeNode};

/// Semantic type of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Failed,
    SeedAggregate,
    SeedEvaluation,
    Ablation,
    Hyperparameter,
    Best,
    Normal,
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Root => "root",
            Self::Failed => "failed",
            Self::SeedAggregate => "seed_aggregate",
            Self::SeedEvaluation => "seed_evaluation",
            Self::Ablation => "ablation",
            Self::Hyperparameter => "hyperparameter",
            Self::Best => "best",
            Self::Normal => "normal",
        };
        write!(f, "{s}")
    }
}

/// Classify one node of a stage tree.
///
/// Returns `Normal` for a node id absent from `nodes`; a stale hover
/// lookup is not worth failing over.
pub fn classify(node_id: u32, nodes: &[TreeNode], edges: &[TreeEdge]) -> NodeType {
    let Some(node) = nodes.iter().find(|n| n.id == node_id) else {
        return NodeType::Normal;
    };

    let has_incoming = edges.iter().any(|e| e.target == node_id);
    if !has_incoming {
        return NodeType::Root;
    }

    let flags = &node.flags;
    if flags.exc_type.is_some() {
        NodeType::Failed
    } else if flags.is_seed_agg_node {
        NodeType::SeedAggregate
    } else if flags.is_seed_node {
        NodeType::SeedEvaluation
    } else if flags.ablation_name.is_some() {
        NodeType::Ablation
    } else if flags.hyperparam_name.is_some() {
        NodeType::Hyperparameter
    } else if flags.is_best {
        NodeType::Best
    } else {
        NodeType::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeNode;

    fn nodes_with_edge() -> (Vec<TreeNode>, Vec<TreeEdge>) {
        let nodes = vec![TreeNode::new(0, 0.5, 0.0), TreeNode::new(1, 0.5, 1.0)];
        let edges = vec![TreeEdge::new(0, 1)];
        (nodes, edges)
    }

    #[test]
    fn test_root_precedes_flag_rules() {
        let (mut nodes, edges) = nodes_with_edge();
        // Even a flagged node is Root when nothing points at it.
        nodes[0].flags.is_best = true;
        assert_eq!(classify(0, &nodes, &edges), NodeType::Root);
    }

    #[test]
    fn test_flagless_root_is_root_not_normal() {
        let (nodes, edges) = nodes_with_edge();
        assert_eq!(classify(0, &nodes, &edges), NodeType::Root);
    }

    #[test]
    fn test_flag_precedence_order() {
        let (mut nodes, edges) = nodes_with_edge();
        let n = &mut nodes[1];
        n.flags.exc_type = Some("OOMError".into());
        n.flags.is_seed_agg_node = true;
        n.flags.is_seed_node = true;
        n.flags.ablation_name = Some("no-dropout".into());
        n.flags.hyperparam_name = Some("lr".into());
        n.flags.is_best = true;
        assert_eq!(classify(1, &nodes, &edges), NodeType::Failed);

        nodes[1].flags.exc_type = None;
        assert_eq!(classify(1, &nodes, &edges), NodeType::SeedAggregate);
        nodes[1].flags.is_seed_agg_node = false;
        assert_eq!(classify(1, &nodes, &edges), NodeType::SeedEvaluation);
        nodes[1].flags.is_seed_node = false;
        assert_eq!(classify(1, &nodes, &edges), NodeType::Ablation);
        nodes[1].flags.ablation_name = None;
        assert_eq!(classify(1, &nodes, &edges), NodeType::Hyperparameter);
        nodes[1].flags.hyperparam_name = None;
        assert_eq!(classify(1, &nodes, &edges), NodeType::Best);
        nodes[1].flags.is_best = false;
        assert_eq!(classify(1, &nodes, &edges), NodeType::Normal);
    }

    #[test]
    fn test_best_and_seed_node_classifies_seed() {
        let (mut nodes, edges) = nodes_with_edge();
        nodes[1].flags.is_best = true;
        nodes[1].flags.is_seed_node = true;
        assert_eq!(classify(1, &nodes, &edges), NodeType::SeedEvaluation);
    }

    #[test]
    fn test_unknown_node_id_is_normal() {
        let (nodes, edges) = nodes_with_edge();
        assert_eq!(classify(99, &nodes, &edges), NodeType::Normal);
    }
}
