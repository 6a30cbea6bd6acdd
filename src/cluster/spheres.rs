//! Sphere clustering: greedy ball covering in decreasing count order.
//!
//! The most abundant unassigned sequence becomes a center and absorbs every
//! unassigned neighbor it dominates (`center.count >= ratio * member.count`).
//! Neighbors it does not dominate stay in the pool. Later centers never have
//! a larger count, so a blocked neighbor becomes a center itself when its
//! turn comes.

use super::{check_inputs, ClusterAlgorithm, ClusteringStrategy, Partition};
use crate::error::Result;
use crate::graph::NeighborGraph;
use log::debug;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy)]
pub struct Spheres {
    ratio: f64,
}

impl Spheres {
    pub fn new(ratio: f64) -> Self {
        Spheres { ratio }
    }

    fn dominates(&self, center_count: u64, member_count: u64) -> bool {
        center_count as f64 >= self.ratio * member_count as f64
    }
}

impl Default for Spheres {
    fn default() -> Self {
        Spheres::new(1.0)
    }
}

impl ClusteringStrategy for Spheres {
    fn algorithm(&self) -> ClusterAlgorithm {
        ClusterAlgorithm::Spheres
    }

    fn partition(&self, graph: &NeighborGraph, counts: &[u64]) -> Result<Partition> {
        check_inputs(graph, counts)?;
        let n = graph.len();

        // Max-count first, ties by ascending index. Assigned entries are
        // skipped when popped.
        let mut pool: BinaryHeap<(u64, Reverse<usize>)> =
            (0..n).map(|i| (counts[i], Reverse(i))).collect();
        let mut labels: Vec<Option<usize>> = vec![None; n];
        let mut n_centers = 0;

        while let Some((center_count, Reverse(center))) = pool.pop() {
            if labels[center].is_some() {
                continue;
            }
            labels[center] = Some(center);
            n_centers += 1;

            for &member in graph.neighbors(center) {
                if labels[member].is_none() && self.dominates(center_count, counts[member]) {
                    labels[member] = Some(center);
                }
            }
        }

        let labels: Vec<usize> = labels
            .into_iter()
            .enumerate()
            .map(|(node, label)| label.unwrap_or(node))
            .collect();
        debug!("Spheres: {} centers over {} sequences", n_centers, n);
        Ok(Partition::from_labels(&labels))
    }
}
