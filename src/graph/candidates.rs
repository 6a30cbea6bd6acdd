//! Candidate pair generation: every unordered pair of sequences within τ.

use crate::bio::SequenceSet;
use crate::error::Result;
use crate::index::{Distance, Neighbors, Trie};
use crate::utils::parallel::parallel_flat_map;
use serde::Serialize;

/// Two sequences within τ of each other, `i < j` by sequence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CandidatePair {
    pub i: usize,
    pub j: usize,
    pub distance: Distance,
}

/// Lazy stream of candidate pairs, one query per sequence in input order.
///
/// Each unordered pair is produced exactly once, from its smaller index.
pub struct CandidatePairs<'a> {
    trie: &'a Trie,
    sequences: &'a SequenceSet,
    tau: usize,
    next_query: usize,
    current: Option<(usize, Neighbors<'a>)>,
}

impl<'a> Iterator for CandidatePairs<'a> {
    type Item = CandidatePair;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((i, hits)) = self.current.as_mut() {
                let i = *i;
                for (j, distance) in hits.by_ref() {
                    if j > i {
                        return Some(CandidatePair { i, j, distance });
                    }
                }
                self.current = None;
            }
            if self.next_query >= self.sequences.len() {
                return None;
            }
            let i = self.next_query;
            self.next_query += 1;
            let query = self.sequences[i].codes.clone();
            self.current = Some((i, self.trie.neighbors_of(query, self.tau)));
        }
    }
}

/// Streams candidate pairs without materializing them.
pub fn candidate_pairs<'a>(
    trie: &'a Trie,
    sequences: &'a SequenceSet,
    tau: usize,
) -> CandidatePairs<'a> {
    CandidatePairs {
        trie,
        sequences,
        tau,
        next_query: 0,
        current: None,
    }
}

/// Runs the neighbor queries in parallel and returns all candidate pairs,
/// sorted by `(i, j)`.
///
/// Queries only read the trie, so the outer loop is sharded across the
/// current rayon pool; each query keeps its own pairs and the shards are
/// concatenated in index order.
pub fn collect_candidate_pairs(
    trie: &Trie,
    sequences: &SequenceSet,
    tau: usize,
    chunk_size: usize,
) -> Result<Vec<CandidatePair>> {
    let pairs = parallel_flat_map(sequences.len(), chunk_size, |i| {
        let mut local: Vec<CandidatePair> = trie
            .neighbors_of(sequences[i].codes.clone(), tau)
            .filter(|&(j, _)| j > i)
            .map(|(j, distance)| CandidatePair { i, j, distance })
            .collect();
        local.sort_unstable();
        local
    })?;
    debug_assert!(pairs.windows(2).all(|w| w[0] < w[1]));
    Ok(pairs)
}
