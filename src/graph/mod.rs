//! The near-neighbor relation over unique sequences.
//!
//! Candidate pairs come out of the trie search; [`NeighborGraph`] turns them
//! into sorted adjacency lists so the clustering strategies can walk a
//! sequence's neighbors in index order.

pub mod candidates;

pub use candidates::{candidate_pairs, collect_candidate_pairs, CandidatePair, CandidatePairs};

use crate::error::{ClusterError, Result};

/// Undirected graph with one node per unique sequence and an edge for every
/// candidate pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborGraph {
    adjacency: Vec<Vec<usize>>,
    n_edges: usize,
}

impl NeighborGraph {
    /// A graph with `n` nodes and no edges.
    pub fn empty(n: usize) -> Self {
        NeighborGraph {
            adjacency: vec![Vec::new(); n],
            n_edges: 0,
        }
    }

    /// Consumes a stream of candidate pairs. Fails if a pair names a node
    /// outside `0..n` or a node paired with itself.
    pub fn from_pairs<I>(n: usize, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = CandidatePair>,
    {
        let mut graph = NeighborGraph::empty(n);
        for pair in pairs {
            if pair.i >= n || pair.j >= n || pair.i == pair.j {
                return Err(ClusterError::InvariantViolation(format!(
                    "candidate pair ({}, {}) is not a pair of distinct sequences among {}",
                    pair.i, pair.j, n
                )));
            }
            graph.adjacency[pair.i].push(pair.j);
            graph.adjacency[pair.j].push(pair.i);
        }
        for list in &mut graph.adjacency {
            list.sort_unstable();
            list.dedup();
        }
        graph.n_edges = graph.adjacency.iter().map(Vec::len).sum::<usize>() / 2;
        Ok(graph)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Number of distinct undirected edges.
    pub fn n_edges(&self) -> usize {
        self.n_edges
    }

    /// Neighbors of `node`, ascending.
    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.adjacency[node]
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }
}
