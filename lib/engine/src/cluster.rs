//! Cluster builder
//!
//! Qualifying pairs are edges of an undirected graph over dataset
//! positions; clusters are its connected components of two or more nodes.
//! Records joined only through a chain of edges still share a cluster, but
//! only pairs that were actually scored are reported.

use crate::table::ScoredPair;
use ahash::AHashMap;
use matchx_core::UnionFind;
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Dataset positions, ascending
    pub members: Vec<usize>,
    /// Scored edges inside the cluster, highest score first
    pub pairs: Vec<ScoredPair>,
}

impl Cluster {
    pub fn best_score(&self) -> f64 {
        self.pairs.first().map_or(0.0, |p| p.score)
    }

    /// True when every reported pair scored exactly 1.0
    pub fn all_exact(&self) -> bool {
        self.pairs.iter().all(|p| p.score >= 1.0)
    }
}

/// Connected components over `edges`, which must be sorted by descending
/// score. Nodes without an edge are not reported.
pub fn build_clusters(nodes: usize, edges: &[ScoredPair]) -> Vec<Cluster> {
    let mut uf = UnionFind::new(nodes);
    let mut touched = vec![false; nodes];
    for edge in edges {
        uf.union(edge.left, edge.right);
        touched[edge.left] = true;
        touched[edge.right] = true;
    }

    let mut by_root: AHashMap<usize, usize> = AHashMap::new();
    let mut clusters: Vec<Cluster> = Vec::new();
    for node in (0..nodes).filter(|&n| touched[n]) {
        let root = uf.find(node);
        let idx = *by_root.entry(root).or_insert_with(|| {
            clusters.push(Cluster {
                members: Vec::new(),
                pairs: Vec::new(),
            });
            clusters.len() - 1
        });
        clusters[idx].members.push(node);
    }

    for edge in edges {
        let root = uf.find(edge.left);
        if let Some(&idx) = by_root.get(&root) {
            clusters[idx].pairs.push(*edge);
        }
    }

    clusters.sort_by(|a, b| {
        OrderedFloat(b.best_score())
            .cmp(&OrderedFloat(a.best_score()))
            .then(a.members.first().cmp(&b.members.first()))
    });
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(score: f64, left: usize, right: usize) -> ScoredPair {
        ScoredPair {
            score,
            left,
            right,
            variant: None,
        }
    }

    #[test]
    fn test_transitive_cluster_reports_scored_pairs_only() {
        // A-B and B-C qualify; A-C was never scored
        let edges = vec![edge(0.8, 0, 1), edge(0.75, 1, 2)];
        let clusters = build_clusters(3, &edges);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1, 2]);
        assert_eq!(clusters[0].pairs, edges);
    }

    #[test]
    fn test_singletons_are_dropped_and_order_is_by_best_score() {
        let edges = vec![edge(0.95, 3, 4), edge(0.9, 0, 1), edge(0.85, 4, 5)];
        let clusters = build_clusters(7, &edges);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![3, 4, 5]);
        assert_eq!(clusters[0].best_score(), 0.95);
        assert_eq!(clusters[1].members, vec![0, 1]);
        assert!(clusters.iter().all(|c| !c.members.contains(&2) && !c.members.contains(&6)));
    }

    #[test]
    fn test_higher_threshold_refines_clusters() {
        let edges = vec![
            edge(0.95, 0, 1),
            edge(0.9, 2, 3),
            edge(0.8, 1, 2),
            edge(0.75, 4, 5),
            edge(0.72, 3, 4),
        ];
        for (low, high) in [(0.7, 0.8), (0.7, 0.9), (0.8, 0.95)] {
            let coarse = build_clusters(6, &edges.iter().copied().filter(|e| e.score >= low).collect::<Vec<_>>());
            let fine = build_clusters(6, &edges.iter().copied().filter(|e| e.score >= high).collect::<Vec<_>>());
            for cluster in &fine {
                let containing = coarse
                    .iter()
                    .filter(|c| cluster.members.iter().all(|m| c.members.contains(m)))
                    .count();
                assert_eq!(containing, 1);
            }
        }
    }

    #[test]
    fn test_all_exact() {
        let clusters = build_clusters(3, &[edge(1.0, 0, 1), edge(1.0, 1, 2)]);
        assert!(clusters[0].all_exact());
        let clusters = build_clusters(3, &[edge(1.0, 0, 1), edge(0.9, 1, 2)]);
        assert!(!clusters[0].all_exact());
    }
}
