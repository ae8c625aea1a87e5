//! Layout -> merge pipeline over multiple stages, end to end.

use runscope_graph::{
    classify, merge_stage_trees, LayeredLayout, LayoutConfig, LayoutEngine, MergeConfig, NodeType,
    StageTree, TreeEdge, TreeNode,
};

/// Build a stage snapshot and position it with the layered layout, the
/// way backend tree snapshots are prepared for merging.
fn laid_out_stage(stage_id: &str, node_ids: &[u32], edges: &[(u32, u32)]) -> StageTree {
    let mut tree = StageTree::new(stage_id);
    let edges: Vec<TreeEdge> = edges.iter().map(|&(s, t)| TreeEdge::new(s, t)).collect();
    let positions = LayeredLayout.layout(node_ids, &edges, &LayoutConfig::default());
    for (&id, pos) in node_ids.iter().zip(&positions) {
        tree.nodes.push(TreeNode::new(id, pos.x, pos.y));
    }
    tree.edges = edges;
    tree
}

#[test]
fn test_two_stage_layout_and_merge() {
    let s1 = laid_out_stage("1_baseline", &[0, 1, 2], &[(0, 1), (0, 2)]);
    let s2 = laid_out_stage("2_tuning", &[0, 1, 2, 3], &[(0, 1), (1, 2), (1, 3)]);

    let config = MergeConfig {
        zone_gap: 0.1,
        min_zone_height: 0.0,
        height_scale: 1.0,
    };
    let merged = merge_stage_trees(&[s1.clone(), s2.clone()], &config).unwrap();

    assert_eq!(merged.nodes.len(), 7);
    assert_eq!(merged.edges.len(), 5);
    assert_eq!(merged.zone_metadata.len(), 2);

    // Zones disjoint, second strictly below the first plus gap.
    let z1 = &merged.zone_metadata[0];
    let z2 = &merged.zone_metadata[1];
    assert!(z1.max <= z2.min);
    assert!((z2.min - z1.max - 0.1).abs() < 1e-9);

    // Every node's y falls inside its stage's zone.
    for node in &merged.nodes {
        let zone = merged
            .zone_metadata
            .iter()
            .find(|z| z.stage_id == node.stage_id)
            .unwrap();
        assert!(node.y >= zone.min - 1e-9 && node.y <= zone.max + 1e-9);
    }

    // Roots classified structurally, before flags.
    assert_eq!(classify(0, &s1.nodes, &s1.edges), NodeType::Root);
    let root = merged.find("1_baseline", 0).unwrap();
    assert_eq!(root.node_type, NodeType::Root);
}

#[test]
fn test_merged_output_stable_across_repeated_runs() {
    let stages = vec![
        laid_out_stage("2_tuning", &[0, 1, 2], &[(0, 1), (0, 2)]),
        laid_out_stage("1_baseline", &[0, 1], &[(0, 1)]),
    ];
    let config = MergeConfig::default();
    let a = merge_stage_trees(&stages, &config).unwrap();
    let b = merge_stage_trees(&stages, &config).unwrap();
    assert_eq!(a, b);
    // Serialized form is byte-identical as well.
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}
