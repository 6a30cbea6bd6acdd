//! Prefix tree over all unique sequences, searched with a bounded edit distance.
//!
//! Every node owns its children outright (one slot per alphabet symbol) and
//! records the shortest and longest remaining suffix below it. Those two
//! lengths, together with the DP row carried down the search, let a branch be
//! abandoned as soon as no sequence beneath it can be within τ of the query.

use crate::bio::{self, SequenceSet, ALPHABET_SIZE};
use crate::error::Result;
use crate::index::distance::{DpRow, Distance};
use log::debug;
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct TrieNode {
    children: [Option<Box<TrieNode>>; ALPHABET_SIZE],
    /// Indices of the sequences terminating at this node.
    terminal: Vec<usize>,
    /// Shortest suffix length from here to a terminal node.
    min_tail: usize,
    /// Longest suffix length from here to a terminal node.
    max_tail: usize,
}

impl TrieNode {
    fn new() -> Self {
        TrieNode {
            children: Default::default(),
            terminal: Vec::new(),
            min_tail: usize::MAX,
            max_tail: 0,
        }
    }

    /// Whether at least one sequence terminates here.
    pub fn is_terminal(&self) -> bool {
        !self.terminal.is_empty()
    }

    /// Indices of the sequences terminating here.
    pub fn terminal_ids(&self) -> &[usize] {
        &self.terminal
    }

    fn note_tail(&mut self, tail: usize) {
        self.min_tail = self.min_tail.min(tail);
        self.max_tail = self.max_tail.max(tail);
    }

    fn merge(&mut self, other: TrieNode) {
        self.terminal.extend(other.terminal);
        self.terminal.sort_unstable();
        self.min_tail = self.min_tail.min(other.min_tail);
        self.max_tail = self.max_tail.max(other.max_tail);
        for (slot, theirs) in self.children.iter_mut().zip(other.children) {
            let Some(theirs) = theirs else { continue };
            match slot {
                Some(mine) => mine.merge(*theirs),
                None => *slot = Some(theirs),
            }
        }
    }

    fn count_nodes(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(|c| c.count_nodes())
            .sum::<usize>()
    }
}

/// Trie index over encoded sequences.
#[derive(Debug, Clone)]
pub struct Trie {
    root: TrieNode,
    n_sequences: usize,
    height: usize,
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Trie {
            root: TrieNode::new(),
            n_sequences: 0,
            height: 0,
        }
    }

    /// Builds the index over every sequence of the set, serially.
    pub fn build(sequences: &SequenceSet) -> Self {
        let mut trie = Trie::new();
        for (id, seq) in sequences.iter().enumerate() {
            trie.insert_codes(&seq.codes, id);
        }
        debug!(
            "Built trie with {} nodes over {} sequences (height {})",
            trie.root.count_nodes(),
            trie.n_sequences,
            trie.height
        );
        trie
    }

    /// Builds independent sub-tries over `shards` contiguous slices of the set
    /// in parallel, then merges them by prefix.
    pub fn build_sharded(sequences: &SequenceSet, shards: usize) -> Self {
        let shards = shards.max(1);
        let seqs = sequences.as_slice();
        if shards == 1 || seqs.len() < 2 * shards {
            return Self::build(sequences);
        }
        let shard_len = seqs.len().div_ceil(shards);

        let trie = seqs
            .par_chunks(shard_len)
            .enumerate()
            .map(|(shard, chunk)| {
                let mut sub = Trie::new();
                let offset = shard * shard_len;
                for (i, seq) in chunk.iter().enumerate() {
                    sub.insert_codes(&seq.codes, offset + i);
                }
                sub
            })
            .reduce(Trie::new, |mut left, right| {
                left.merge(right);
                left
            });
        debug!(
            "Merged {} trie shards over {} sequences (height {})",
            shards, trie.n_sequences, trie.height
        );
        trie
    }

    /// Inserts a sequence given as text. Fails with `InvalidSymbol` on an
    /// unrecognized symbol, leaving the trie unchanged.
    pub fn insert(&mut self, seq: &[u8], id: usize) -> Result<()> {
        let codes = bio::encode(seq, id)?;
        self.insert_codes(&codes, id);
        Ok(())
    }

    fn insert_codes(&mut self, codes: &[u8], id: usize) {
        let len = codes.len();
        let mut node = &mut self.root;
        node.note_tail(len);
        for (depth, &code) in codes.iter().enumerate() {
            node = node.children[code as usize]
                .get_or_insert_with(|| Box::new(TrieNode::new()))
                .as_mut();
            node.note_tail(len - depth - 1);
        }
        let at = node.terminal.partition_point(|&x| x < id);
        node.terminal.insert(at, id);
        self.n_sequences += 1;
        self.height = self.height.max(len);
    }

    /// Absorbs all sequences of `other`.
    pub fn merge(&mut self, other: Trie) {
        self.root.merge(other.root);
        self.n_sequences += other.n_sequences;
        self.height = self.height.max(other.height);
    }

    /// Number of inserted sequences, duplicates included.
    pub fn len(&self) -> usize {
        self.n_sequences
    }

    pub fn is_empty(&self) -> bool {
        self.n_sequences == 0
    }

    /// Length of the longest inserted sequence.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Ids terminating at exactly this sequence, if any.
    pub fn lookup(&self, seq: &[u8]) -> Option<&[usize]> {
        let mut node = &self.root;
        for &base in seq {
            let code = bio::symbol_code(base)?;
            node = node.children[code as usize].as_deref()?;
        }
        node.is_terminal().then_some(node.terminal_ids())
    }

    /// All inserted sequences within distance `tau` of `seq`, as
    /// `(index, distance)` pairs.
    pub fn query_within(&self, seq: &[u8], tau: usize) -> Result<Neighbors<'_>> {
        let codes = bio::encode(seq, 0)?;
        Ok(self.neighbors_of(codes, tau))
    }

    /// Same as [`Trie::query_within`] for an already-encoded query.
    pub fn neighbors_of(&self, query: Vec<u8>, tau: usize) -> Neighbors<'_> {
        let tau = Distance::try_from(tau).unwrap_or(Distance::MAX);
        Neighbors::new(&self.root, query, tau)
    }
}

/// Lazy depth-first search for sequences within τ of a query.
///
/// Children are visited in alphabet order; ids sharing a terminal node come
/// out in ascending order.
pub struct Neighbors<'t> {
    query: Vec<u8>,
    tau: Distance,
    stack: Vec<(&'t TrieNode, DpRow)>,
    pending: Vec<(usize, Distance)>,
}

impl<'t> Neighbors<'t> {
    fn new(root: &'t TrieNode, query: Vec<u8>, tau: Distance) -> Self {
        let row = DpRow::initial(query.len());
        let mut stack = Vec::new();
        if root.min_tail != usize::MAX && row.lower_bound(root.min_tail, root.max_tail) <= tau {
            stack.push((root, row));
        }
        Neighbors {
            query,
            tau,
            stack,
            pending: Vec::new(),
        }
    }
}

impl<'t> Iterator for Neighbors<'t> {
    type Item = (usize, Distance);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(hit) = self.pending.pop() {
                return Some(hit);
            }
            let (node, row) = self.stack.pop()?;

            if node.is_terminal() {
                let distance = row.last();
                if distance <= self.tau {
                    self.pending
                        .extend(node.terminal.iter().rev().map(|&id| (id, distance)));
                }
            }

            // Reverse push so the smallest symbol is searched first.
            for symbol in (0..ALPHABET_SIZE).rev() {
                let Some(child) = node.children[symbol].as_deref() else {
                    continue;
                };
                let child_row = row.extend(symbol as u8, &self.query);
                if child_row.lower_bound(child.min_tail, child.max_tail) <= self.tau {
                    self.stack.push((child, child_row));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::distance::brute_force_distance;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn set(reads: &[&str]) -> SequenceSet {
        SequenceSet::from_reads(reads.iter().copied()).unwrap()
    }

    fn sorted_hits(trie: &Trie, query: &str, tau: usize) -> Vec<(usize, Distance)> {
        let mut hits: Vec<_> = trie.query_within(query.as_bytes(), tau).unwrap().collect();
        hits.sort_unstable();
        hits
    }

    fn random_barcodes(rng: &mut StdRng, n: usize) -> Vec<String> {
        let bases = b"ACGTN";
        let template: Vec<u8> = (0..12).map(|_| bases[rng.random_range(0..4)]).collect();
        (0..n)
            .map(|_| {
                let mut s = template.clone();
                for _ in 0..rng.random_range(0..4) {
                    let pos = rng.random_range(0..s.len());
                    match rng.random_range(0..3) {
                        0 => s[pos] = bases[rng.random_range(0..5)],
                        1 => s.insert(pos, bases[rng.random_range(0..4)]),
                        _ => {
                            s.remove(pos);
                        }
                    }
                }
                String::from_utf8(s).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_exact_lookup() {
        let trie = Trie::build(&set(&["ACGT", "ACGA", "AC"]));
        assert_eq!(trie.lookup(b"ACGT"), Some(&[0][..]));
        assert_eq!(trie.lookup(b"AC"), Some(&[2][..]));
        assert_eq!(trie.lookup(b"ACG"), None);
        assert_eq!(trie.lookup(b"TTTT"), None);
        assert_eq!(trie.len(), 3);
        assert_eq!(trie.height(), 4);
    }

    #[test]
    fn test_duplicate_ids_share_terminal() {
        let mut trie = Trie::new();
        trie.insert(b"AAAA", 0).unwrap();
        trie.insert(b"AAAT", 1).unwrap();
        trie.insert(b"aaaa", 2).unwrap();
        assert_eq!(trie.lookup(b"AAAA"), Some(&[0, 2][..]));
        assert_eq!(sorted_hits(&trie, "AAAA", 0), vec![(0, 0), (2, 0)]);
    }

    #[test]
    fn test_insert_rejects_invalid_symbol() {
        let mut trie = Trie::new();
        assert!(trie.insert(b"ACGU", 0).is_err());
        assert!(trie.is_empty());
    }

    #[test]
    fn test_query_within_tau() {
        let trie = Trie::build(&set(&["AAAA", "AAAT", "GGGG", "AATT", "AAA"]));
        assert_eq!(sorted_hits(&trie, "AAAA", 1), vec![(0, 0), (1, 1), (4, 1)]);
        assert_eq!(
            sorted_hits(&trie, "AAAA", 2),
            vec![(0, 0), (1, 1), (3, 2), (4, 1)]
        );
        assert!(sorted_hits(&trie, "CCCC", 1).is_empty());
    }

    #[test]
    fn test_wildcard_query_and_index() {
        let trie = Trie::build(&set(&["ANAA", "CCCC"]));
        assert_eq!(sorted_hits(&trie, "AAAA", 0), vec![(0, 0)]);
        assert_eq!(sorted_hits(&trie, "NNNN", 0), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn test_differing_lengths() {
        let trie = Trie::build(&set(&["ACGTACGT", "ACGTACG", "ACGTACGTT", "CGTACGT"]));
        assert_eq!(
            sorted_hits(&trie, "ACGTACGT", 1),
            vec![(0, 0), (1, 1), (2, 1), (3, 1)]
        );
    }

    #[test]
    fn test_huge_tau_finds_everything() {
        let trie = Trie::build(&set(&["AAAA", "CCCCCC", "G", "ACGTACGTAC"]));
        assert_eq!(
            sorted_hits(&trie, "AAAA", usize::MAX),
            vec![(0, 0), (1, 6), (2, 4), (3, 7)]
        );
    }

    #[test]
    fn test_merge_keeps_terminal_ids_ascending() {
        let mut low = Trie::new();
        let mut high = Trie::new();
        high.insert(b"ACGT", 5).unwrap();
        high.insert(b"ACGT", 3).unwrap();
        low.insert(b"ACGT", 4).unwrap();
        low.insert(b"ACGT", 1).unwrap();
        high.merge(low);

        assert_eq!(high.lookup(b"ACGT"), Some(&[1, 3, 4, 5][..]));
        let hits: Vec<_> = high.query_within(b"ACGT", 0).unwrap().collect();
        assert_eq!(hits, vec![(1, 0), (3, 0), (4, 0), (5, 0)]);
        assert_eq!(high.len(), 4);
    }

    #[test]
    fn test_empty_trie_yields_nothing() {
        let trie = Trie::new();
        assert_eq!(trie.query_within(b"ACGT", 3).unwrap().count(), 0);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        let reads = random_barcodes(&mut rng, 200);
        let seqs = SequenceSet::from_reads(&reads).unwrap();
        let trie = Trie::build(&seqs);

        for tau in 0..=3usize {
            for (i, query) in seqs.iter().enumerate().take(40) {
                let mut hits: Vec<_> = trie.neighbors_of(query.codes.clone(), tau).collect();
                hits.sort_unstable();
                let expected: Vec<_> = seqs
                    .iter()
                    .enumerate()
                    .filter_map(|(j, other)| {
                        let d = brute_force_distance(&query.codes, &other.codes);
                        (d as usize <= tau).then_some((j, d))
                    })
                    .collect();
                assert_eq!(hits, expected, "query {} at tau {}", i, tau);
            }
        }
    }

    #[test]
    fn test_insertion_order_independent() {
        let mut rng = StdRng::seed_from_u64(11);
        let reads = random_barcodes(&mut rng, 120);
        let seqs = SequenceSet::from_reads(&reads).unwrap();

        let forward = Trie::build(&seqs);
        let mut backward = Trie::new();
        for (id, seq) in seqs.iter().enumerate().rev() {
            backward.insert(seq.text.as_bytes(), id).unwrap();
        }
        let sharded = Trie::build_sharded(&seqs, 4);

        for seq in seqs.iter().take(30) {
            let mut a: Vec<_> = forward.neighbors_of(seq.codes.clone(), 2).collect();
            let mut b: Vec<_> = backward.neighbors_of(seq.codes.clone(), 2).collect();
            let mut c: Vec<_> = sharded.neighbors_of(seq.codes.clone(), 2).collect();
            a.sort_unstable();
            b.sort_unstable();
            c.sort_unstable();
            assert_eq!(a, b);
            assert_eq!(a, c);
        }
        assert_eq!(sharded.len(), forward.len());
        assert_eq!(sharded.height(), forward.height());
    }
}
