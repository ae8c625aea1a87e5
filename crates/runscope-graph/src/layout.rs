//! Layered (Sugiyama-style) DAG layout behind a replaceable trait.
//!
//! Three phases:
//! 1. Rank assignment — longest-path via Kahn's topological order,
//!    deterministic tie-breaks by node id
//! 2. Crossing minimization — alternating forward/backward barycenter
//!    sweeps over the rank ordering
//! 3. Coordinate assignment — ranks become rows spaced by `rank_sep`,
//!    nodes within a rank spaced by `node_sep` and centered, then
//!    everything is normalized into [0, 1]²
//!
//! Disconnected components (multiple roots) are handled naturally by
//! the topological seeding; nodes left unvisited by a cycle are pushed
//! to one rank past the deepest visited node. Repeated layouts of the
//! same `(nodes, edges, config)` are identical so unchanged renders
//! never jitter.

use tracing::warn;

use crate::tree::{Position, TreeEdge};

/// Tuning knobs for the layered layout.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Horizontal spacing between adjacent nodes of one rank.
    pub node_sep: f64,
    /// Vertical spacing between ranks.
    pub rank_sep: f64,
    /// Number of barycenter sweep rounds (forward + backward each).
    pub sweeps: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_sep: 1.0,
            rank_sep: 1.0,
            sweeps: 4,
        }
    }
}

/// Replaceable layout capability: `(nodes, edges, config) -> positions`.
///
/// Positions are returned in the same order as `node_ids`, normalized
/// into [0, 1]². Any Sugiyama-style implementation satisfies the
/// contract as long as it is deterministic for a fixed input.
pub trait LayoutEngine {
    fn layout(&self, node_ids: &[u32], edges: &[TreeEdge], config: &LayoutConfig)
        -> Vec<Position>;
}

/// The default layered layout implementation.
#[derive(Debug, Clone, Default)]
pub struct LayeredLayout;

impl LayoutEngine for LayeredLayout {
    fn layout(
        &self,
        node_ids: &[u32],
        edges: &[TreeEdge],
        config: &LayoutConfig,
    ) -> Vec<Position> {
        let n = node_ids.len();
        if n == 0 {
            return vec![];
        }

        let index_of = |id: u32| node_ids.iter().position(|&nid| nid == id);

        // Adjacency on dense indices; dangling edge endpoints are
        // skipped per edge, never fail the layout.
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut rev: Vec<Vec<usize>> = vec![Vec::new(); n];
        for edge in edges {
            match (index_of(edge.source), index_of(edge.target)) {
                (Some(s), Some(t)) => {
                    adj[s].push(t);
                    rev[t].push(s);
                }
                _ => {
                    warn!(source = edge.source, target = edge.target, "dangling edge skipped");
                }
            }
        }

        let ranks = assign_ranks(node_ids, &adj, &rev);
        let mut rank_order = build_rank_order(node_ids, &ranks);
        minimize_crossings(&mut rank_order, node_ids, &adj, &rev, config.sweeps);
        assign_coordinates(&rank_order, n, config)
    }
}

/// Longest-path rank assignment with Kahn's algorithm for determinism.
fn assign_ranks(node_ids: &[u32], adj: &[Vec<usize>], rev: &[Vec<usize>]) -> Vec<usize> {
    let n = node_ids.len();
    let mut in_degree: Vec<usize> = rev.iter().map(|preds| preds.len()).collect();

    // Seed with sources, sorted by node id.
    let mut queue: Vec<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    queue.sort_by_key(|&v| node_ids[v]);

    let mut ranks = vec![0usize; n];
    let mut visited = vec![false; n];
    let mut head = 0;
    while head < queue.len() {
        let u = queue[head];
        head += 1;
        visited[u] = true;

        let mut successors = adj[u].clone();
        successors.sort_by_key(|&v| node_ids[v]);
        for v in successors {
            ranks[v] = ranks[v].max(ranks[u] + 1);
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push(v);
            }
        }
    }

    // Cycle leftovers land one rank past the deepest visited node.
    if head < n {
        let max_rank = ranks.iter().copied().max().unwrap_or(0);
        for v in 0..n {
            if !visited[v] {
                ranks[v] = max_rank + 1;
            }
        }
    }

    ranks
}

/// rank_order[r] = node indices at rank r, initially sorted by node id.
fn build_rank_order(node_ids: &[u32], ranks: &[usize]) -> Vec<Vec<usize>> {
    let max_rank = ranks.iter().copied().max().unwrap_or(0);
    let mut buckets = vec![Vec::new(); max_rank + 1];
    for (v, &r) in ranks.iter().enumerate() {
        buckets[r].push(v);
    }
    for bucket in &mut buckets {
        bucket.sort_by_key(|&v| node_ids[v]);
    }
    buckets
}

fn barycenter(positions: &[usize], neighbors: &[usize]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &nb in neighbors {
        let pos = positions[nb];
        if pos != usize::MAX {
            sum += pos as f64;
            count += 1;
        }
    }
    if count == 0 {
        f64::MAX
    } else {
        sum / count as f64
    }
}

/// Alternating barycenter sweeps; ties break by node id.
fn minimize_crossings(
    rank_order: &mut [Vec<usize>],
    node_ids: &[u32],
    adj: &[Vec<usize>],
    rev: &[Vec<usize>],
    sweeps: usize,
) {
    let n = node_ids.len();
    let mut positions = vec![usize::MAX; n];

    let mut reorder = |rank: &mut Vec<usize>, positions: &[usize], neighbors: &[Vec<usize>]| {
        let mut scored: Vec<(usize, f64)> = rank
            .iter()
            .map(|&v| (v, barycenter(positions, &neighbors[v])))
            .collect();
        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| node_ids[a.0].cmp(&node_ids[b.0]))
        });
        *rank = scored.into_iter().map(|(v, _)| v).collect();
    };

    for _ in 0..sweeps {
        // Forward: order rank r by rank r-1.
        for r in 1..rank_order.len() {
            fill_positions(&rank_order[r - 1], &mut positions);
            reorder(&mut rank_order[r], &positions, rev);
        }
        // Backward: order rank r by rank r+1.
        for r in (0..rank_order.len().saturating_sub(1)).rev() {
            fill_positions(&rank_order[r + 1], &mut positions);
            reorder(&mut rank_order[r], &positions, adj);
        }
    }
}

fn fill_positions(order: &[usize], positions: &mut [usize]) {
    positions.fill(usize::MAX);
    for (pos, &v) in order.iter().enumerate() {
        positions[v] = pos;
    }
}

/// Rows spaced by rank_sep, columns by node_sep, centered per rank,
/// then normalized into [0, 1]². A degenerate axis collapses to 0.5.
fn assign_coordinates(rank_order: &[Vec<usize>], n: usize, config: &LayoutConfig) -> Vec<Position> {
    let mut raw = vec![Position { x: 0.0, y: 0.0 }; n];
    let widest = rank_order.iter().map(Vec::len).max().unwrap_or(1);

    for (r, rank) in rank_order.iter().enumerate() {
        let row_width = (rank.len().saturating_sub(1)) as f64 * config.node_sep;
        let offset = ((widest - 1) as f64 * config.node_sep - row_width) / 2.0;
        for (i, &v) in rank.iter().enumerate() {
            raw[v] = Position {
                x: offset + i as f64 * config.node_sep,
                y: r as f64 * config.rank_sep,
            };
        }
    }

    normalize(&mut raw);
    raw
}

fn normalize(positions: &mut [Position]) {
    let (mut min_x, mut max_x) = (f64::MAX, f64::MIN);
    let (mut min_y, mut max_y) = (f64::MAX, f64::MIN);
    for p in positions.iter() {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    let span_x = max_x - min_x;
    let span_y = max_y - min_y;
    for p in positions.iter_mut() {
        p.x = if span_x > 0.0 { (p.x - min_x) / span_x } else { 0.5 };
        p.y = if span_y > 0.0 { (p.y - min_y) / span_y } else { 0.5 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(node_ids: &[u32], edges: &[TreeEdge]) -> Vec<Position> {
        LayeredLayout.layout(node_ids, edges, &LayoutConfig::default())
    }

    #[test]
    fn test_empty_input() {
        assert!(layout(&[], &[]).is_empty());
    }

    #[test]
    fn test_single_node_centers() {
        let positions = layout(&[0], &[]);
        assert_eq!(positions.len(), 1);
        assert!((positions[0].x - 0.5).abs() < 1e-9);
        assert!((positions[0].y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_chain_ranks_increase_down() {
        let edges = vec![TreeEdge::new(0, 1), TreeEdge::new(1, 2)];
        let positions = layout(&[0, 1, 2], &edges);
        assert!(positions[0].y < positions[1].y);
        assert!(positions[1].y < positions[2].y);
        assert!((positions[0].y - 0.0).abs() < 1e-9);
        assert!((positions[2].y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_positions_within_unit_square() {
        let edges = vec![
            TreeEdge::new(0, 1),
            TreeEdge::new(0, 2),
            TreeEdge::new(1, 3),
            TreeEdge::new(2, 3),
            TreeEdge::new(2, 4),
        ];
        let positions = layout(&[0, 1, 2, 3, 4], &edges);
        for p in &positions {
            assert!((0.0..=1.0).contains(&p.x), "x out of range: {}", p.x);
            assert!((0.0..=1.0).contains(&p.y), "y out of range: {}", p.y);
        }
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let node_ids = vec![5, 3, 8, 1, 9];
        let edges = vec![TreeEdge::new(3, 5), TreeEdge::new(3, 8), TreeEdge::new(5, 1)];
        let a = layout(&node_ids, &edges);
        let b = layout(&node_ids, &edges);
        assert_eq!(a, b);
    }

    #[test]
    fn test_disconnected_components_do_not_fail() {
        // Two separate chains, no shared edges.
        let edges = vec![TreeEdge::new(0, 1), TreeEdge::new(2, 3)];
        let positions = layout(&[0, 1, 2, 3], &edges);
        assert_eq!(positions.len(), 4);
        // Both roots land on the top rank.
        assert!((positions[0].y - positions[2].y).abs() < 1e-9);
    }

    #[test]
    fn test_dangling_edge_skipped() {
        let edges = vec![TreeEdge::new(0, 1), TreeEdge::new(0, 99)];
        let positions = layout(&[0, 1], &edges);
        assert_eq!(positions.len(), 2);
        assert!(positions[0].y < positions[1].y);
    }

    #[test]
    fn test_cycle_nodes_get_extra_rank() {
        // 0 -> 1, plus a 2 <-> 3 cycle disconnected from the DAG part.
        let edges = vec![TreeEdge::new(0, 1), TreeEdge::new(2, 3), TreeEdge::new(3, 2)];
        let positions = layout(&[0, 1, 2, 3], &edges);
        assert_eq!(positions.len(), 4);
        // Cycle members share the overflow rank.
        assert!((positions[2].y - positions[3].y).abs() < 1e-9);
    }
}
