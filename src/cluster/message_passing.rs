//! Message-passing clustering.
//!
//! Each sequence points at a candidate canonical, itself at first. A
//! sequence's support is the total count of the sequences currently pointing
//! at it. In every round each sequence re-points to the best-supported member
//! of its closed neighborhood (itself plus its neighbors), ties going to the
//! smallest index. Rounds are synchronous: all reads of a round see only the
//! previous round's [`SupportSnapshot`]. Iteration stops at a fixed point or
//! at the round cap.
//!
//! Within one snapshot a pointer always goes to a strictly better ranked
//! node, so following pointers ends at a self-pointing canonical. Clusters
//! are the sets of sequences that end at the same canonical.

use super::{check_inputs, ClusterAlgorithm, ClusteringStrategy, Partition};
use crate::error::{ClusterError, ClusterWarning, Result};
use crate::graph::NeighborGraph;
use log::{debug, warn};
use rayon::prelude::*;
use std::cmp::Reverse;

/// Pointer assignment and the support it induces, as committed at the end
/// of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportSnapshot {
    /// Round that produced this snapshot; 0 is the initial state.
    pub round: usize,
    /// `pointers[i]` is the current candidate canonical of sequence `i`.
    pub pointers: Vec<usize>,
    /// `support[p]` is the summed count of all sequences pointing at `p`.
    pub support: Vec<u64>,
}

impl SupportSnapshot {
    /// Every sequence nominates itself.
    pub fn initial(counts: &[u64]) -> Self {
        SupportSnapshot {
            round: 0,
            pointers: (0..counts.len()).collect(),
            support: counts.to_vec(),
        }
    }

    fn tally(pointers: &[usize], counts: &[u64]) -> Vec<u64> {
        let mut support = vec![0u64; pointers.len()];
        for (node, &target) in pointers.iter().enumerate() {
            support[target] = support[target].saturating_add(counts[node]);
        }
        support
    }

    /// Best-ranked member of the closed neighborhood of `node`.
    fn best_candidate(&self, graph: &NeighborGraph, node: usize) -> usize {
        std::iter::once(node)
            .chain(graph.neighbors(node).iter().copied())
            .max_by_key(|&candidate| (self.support[candidate], Reverse(candidate)))
            .unwrap_or(node)
    }

    /// Computes the next round from this snapshot only.
    pub fn advance(&self, graph: &NeighborGraph, counts: &[u64]) -> SupportSnapshot {
        let pointers: Vec<usize> = (0..self.pointers.len())
            .into_par_iter()
            .map(|node| self.best_candidate(graph, node))
            .collect();
        let support = Self::tally(&pointers, counts);
        SupportSnapshot {
            round: self.round + 1,
            pointers,
            support,
        }
    }

    /// Number of sequences whose pointer differs between the two snapshots.
    pub fn changed_from(&self, previous: &SupportSnapshot) -> usize {
        self.pointers
            .iter()
            .zip(&previous.pointers)
            .filter(|(a, b)| a != b)
            .count()
    }

    /// Follows pointers to the self-pointing canonical of every sequence.
    pub fn resolve(&self) -> Result<Vec<usize>> {
        let n = self.pointers.len();
        let mut labels = vec![usize::MAX; n];
        let mut path = Vec::new();

        for start in 0..n {
            let mut node = start;
            path.clear();
            while labels[node] == usize::MAX && self.pointers[node] != node {
                path.push(node);
                if path.len() > n {
                    return Err(ClusterError::InvariantViolation(format!(
                        "pointer cycle through sequence {} in round {}",
                        start, self.round
                    )));
                }
                node = self.pointers[node];
            }
            let canonical = if labels[node] == usize::MAX {
                node
            } else {
                labels[node]
            };
            labels[node] = canonical;
            for &visited in &path {
                labels[visited] = canonical;
            }
        }
        Ok(labels)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MessagePassing {
    max_rounds: usize,
}

impl MessagePassing {
    pub fn new(max_rounds: usize) -> Self {
        MessagePassing {
            max_rounds: max_rounds.max(1),
        }
    }

    /// Runs rounds until a fixed point or the cap. Returns the last snapshot
    /// and whether it is a fixed point.
    pub fn run(&self, graph: &NeighborGraph, counts: &[u64]) -> (SupportSnapshot, bool) {
        let mut snapshot = SupportSnapshot::initial(counts);
        while snapshot.round < self.max_rounds {
            let next = snapshot.advance(graph, counts);
            let changed = next.changed_from(&snapshot);
            debug!("Message passing round {}: {} pointers changed", next.round, changed);
            snapshot = next;
            if changed == 0 {
                return (snapshot, true);
            }
        }
        (snapshot, false)
    }
}

impl Default for MessagePassing {
    fn default() -> Self {
        MessagePassing::new(100)
    }
}

impl ClusteringStrategy for MessagePassing {
    fn algorithm(&self) -> ClusterAlgorithm {
        ClusterAlgorithm::MessagePassing
    }

    fn partition(&self, graph: &NeighborGraph, counts: &[u64]) -> Result<Partition> {
        check_inputs(graph, counts)?;

        let (snapshot, converged) = self.run(graph, counts);
        let labels = snapshot.resolve()?;

        let mut partition = Partition::from_labels(&labels);
        partition.rounds = Some(snapshot.round);
        if !converged {
            let warning = ClusterWarning::NonConvergence {
                rounds: snapshot.round,
            };
            warn!("{}; using the last pointer assignment", warning);
            partition.warnings.push(warning);
        }
        debug!(
            "Message passing: {} clusters after {} rounds",
            partition.len(),
            snapshot.round
        );
        Ok(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Cluster;
    use crate::graph::CandidatePair;

    fn graph(n: usize, edges: &[(usize, usize)]) -> NeighborGraph {
        NeighborGraph::from_pairs(
            n,
            edges.iter().map(|&(i, j)| CandidatePair { i, j, distance: 1 }),
        )
        .unwrap()
    }

    #[test]
    fn test_star_collapses_to_center() {
        let g = graph(4, &[(0, 1), (0, 2), (0, 3)]);
        let partition = MessagePassing::default().partition(&g, &[50, 2, 1, 3]).unwrap();
        assert_eq!(
            partition.clusters,
            vec![Cluster { canonical: 0, members: vec![0, 1, 2, 3] }]
        );
        assert!(partition.warnings.is_empty());
    }

    #[test]
    fn test_low_support_bridge_splits() {
        // Two abundant sequences joined only through a rare one.
        let g = graph(3, &[(0, 1), (1, 2)]);
        let partition = MessagePassing::default().partition(&g, &[10, 1, 10]).unwrap();
        assert_eq!(
            partition.clusters,
            vec![
                Cluster { canonical: 0, members: vec![0, 1] },
                Cluster { canonical: 2, members: vec![2] },
            ]
        );
    }

    #[test]
    fn test_chain_follows_pointers() {
        // 2 points at 1, 1 points at 0: all end at 0.
        let g = graph(3, &[(0, 1), (1, 2)]);
        let partition = MessagePassing::default().partition(&g, &[10, 3, 1]).unwrap();
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.clusters[0].canonical, 0);
    }

    #[test]
    fn test_rounds_read_previous_snapshot_only() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let counts = [10, 3, 1];
        let first = SupportSnapshot::initial(&counts).advance(&g, &counts);
        assert_eq!(first.round, 1);
        // Sequence 2 sees the initial support of 1 (3), not its updated support.
        assert_eq!(first.pointers, vec![0, 0, 1]);
        assert_eq!(first.support, vec![13, 1, 0]);
    }

    #[test]
    fn test_round_cap_reports_non_convergence() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let partition = MessagePassing::new(1).partition(&g, &[10, 3, 1]).unwrap();
        assert_eq!(partition.rounds, Some(1));
        assert_eq!(
            partition.warnings,
            vec![ClusterWarning::NonConvergence { rounds: 1 }]
        );
        // The last state is still a valid partition.
        let members: usize = partition.clusters.iter().map(|c| c.members.len()).sum();
        assert_eq!(members, 3);
    }

    #[test]
    fn test_support_saturates_on_huge_counts() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let partition = MessagePassing::default()
            .partition(&g, &[u64::MAX, u64::MAX - 1, 5])
            .unwrap();
        assert_eq!(partition.len(), 1);
        assert_eq!(partition.clusters[0].canonical, 0);
    }

    #[test]
    fn test_isolated_sequences_keep_themselves() {
        let g = graph(2, &[]);
        let partition = MessagePassing::default().partition(&g, &[1, 1]).unwrap();
        assert_eq!(partition.len(), 2);
        assert_eq!(partition.rounds, Some(1));
    }

    #[test]
    fn test_resolve_detects_cycle() {
        let snapshot = SupportSnapshot {
            round: 3,
            pointers: vec![1, 0],
            support: vec![1, 1],
        };
        assert!(matches!(
            snapshot.resolve(),
            Err(ClusterError::InvariantViolation(_))
        ));
    }
}
