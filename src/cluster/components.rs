//! Connected-component clustering.
//!
//! Every candidate pair is an edge; a cluster is a connected component, so
//! two sequences chained through any path of neighbors end up together even
//! when they are farther apart than τ themselves.

use super::{check_inputs, ClusterAlgorithm, ClusteringStrategy, DisjointSets, Partition, TieBreak};
use crate::error::Result;
use crate::graph::NeighborGraph;
use log::debug;
use std::cmp::Reverse;

#[derive(Debug, Clone, Copy)]
pub struct Components {
    tie_break: TieBreak,
}

impl Components {
    pub fn new(tie_break: TieBreak) -> Self {
        Components { tie_break }
    }

    /// Ranking key of a candidate canonical; the largest key wins.
    fn key(&self, node: usize, graph: &NeighborGraph, counts: &[u64]) -> (u64, usize, Reverse<usize>) {
        let degree = match self.tie_break {
            TieBreak::SmallestIndex => 0,
            TieBreak::MostNeighbors => graph.degree(node),
        };
        (counts[node], degree, Reverse(node))
    }
}

impl Default for Components {
    fn default() -> Self {
        Components::new(TieBreak::SmallestIndex)
    }
}

impl ClusteringStrategy for Components {
    fn algorithm(&self) -> ClusterAlgorithm {
        ClusterAlgorithm::Components
    }

    fn partition(&self, graph: &NeighborGraph, counts: &[u64]) -> Result<Partition> {
        check_inputs(graph, counts)?;
        let n = graph.len();

        let mut sets = DisjointSets::new(n);
        for i in 0..n {
            for &j in graph.neighbors(i).iter().filter(|&&j| j > i) {
                sets.union(i, j);
            }
        }

        // Best member per root.
        let mut best: Vec<Option<usize>> = vec![None; n];
        for node in 0..n {
            let root = sets.find(node);
            best[root] = match best[root] {
                Some(current)
                    if self.key(current, graph, counts) >= self.key(node, graph, counts) =>
                {
                    Some(current)
                }
                _ => Some(node),
            };
        }

        let labels: Vec<usize> = (0..n)
            .map(|node| {
                let root = sets.find(node);
                best[root].unwrap_or(node)
            })
            .collect();

        let partition = Partition::from_labels(&labels);
        debug!(
            "Connected components: {} clusters over {} sequences",
            partition.len(),
            n
        );
        Ok(partition)
    }
}
