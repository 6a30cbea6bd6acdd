//! The sequence model: unique sequences with their multiplicities.
//!
//! Raw input records are collapsed by exact (case-insensitive) identity into
//! [`Sequence`] entries before indexing. Each entry keeps the list of input
//! positions it was collapsed from, so the aggregated output can be checked
//! against the original records.

use crate::bio;
use crate::error::{ClusterError, Result};
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::debug;

/// A unique sequence and the raw records collapsed into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// Upper-case text of the sequence.
    pub text: String,
    /// Symbol codes, see [`bio::symbol_code`].
    pub codes: Vec<u8>,
    /// Total occurrence count of all records collapsed here.
    pub count: u64,
    /// 0-based input positions of the collapsed records, ascending.
    pub ids: Vec<usize>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Unique sequences in order of first appearance in the input.
///
/// The position of a sequence in this set is its stable index for the rest
/// of the run.
#[derive(Debug, Clone, Default)]
pub struct SequenceSet {
    sequences: Vec<Sequence>,
    n_records: usize,
}

impl SequenceSet {
    /// Builds a set from raw reads, each counting once.
    pub fn from_reads<I, S>(reads: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_counts(reads.into_iter().map(|r| (r, 1)))
    }

    /// Builds a set from pre-aggregated `(sequence, count)` records.
    ///
    /// Fails with `InvalidSymbol` on the first unrecognized symbol and with
    /// `InvalidParameter` on a zero count or when the counts together do not
    /// fit in a `u64`. Every per-cluster sum downstream is bounded by that total.
    pub fn from_counts<I, S>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut unique: IndexMap<String, Sequence> = IndexMap::new();
        let mut n_records = 0;
        let mut total: u64 = 0;

        for (index, (raw, count)) in records.into_iter().enumerate() {
            n_records += 1;
            if count == 0 {
                return Err(ClusterError::InvalidParameter(format!(
                    "sequence {} has a count of 0",
                    index
                )));
            }
            total = total.checked_add(count).ok_or_else(|| {
                ClusterError::InvalidParameter(format!(
                    "count of sequence {} overflows the total record count",
                    index
                ))
            })?;
            let codes = bio::encode(raw.as_ref().as_bytes(), index)?;
            let text = bio::decode(&codes);

            match unique.entry(text) {
                Entry::Occupied(mut entry) => {
                    let seq = entry.get_mut();
                    seq.count += count;
                    seq.ids.push(index);
                }
                Entry::Vacant(entry) => {
                    let text = entry.key().clone();
                    entry.insert(Sequence {
                        text,
                        codes,
                        count,
                        ids: vec![index],
                    });
                }
            }
        }

        debug!(
            "Collapsed {} input records into {} unique sequences",
            n_records,
            unique.len()
        );

        Ok(SequenceSet {
            sequences: unique.into_values().collect(),
            n_records,
        })
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Number of raw input records before collapsing.
    pub fn n_records(&self) -> usize {
        self.n_records
    }

    pub fn get(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.sequences.iter()
    }

    pub fn as_slice(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Per-sequence counts, indexed like the set.
    pub fn counts(&self) -> Vec<u64> {
        self.sequences.iter().map(|s| s.count).collect()
    }

    /// Sum of all counts.
    pub fn total_count(&self) -> u64 {
        self.sequences.iter().map(|s| s.count).sum()
    }

    /// Median length of the unique sequences (upper median), or `None` if empty.
    pub fn median_len(&self) -> Option<usize> {
        if self.sequences.is_empty() {
            return None;
        }
        let mut lengths: Vec<usize> = self.sequences.iter().map(Sequence::len).collect();
        lengths.sort_unstable();
        Some(lengths[lengths.len() / 2])
    }
}

impl std::ops::Index<usize> for SequenceSet {
    type Output = Sequence;

    fn index(&self, index: usize) -> &Sequence {
        &self.sequences[index]
    }
}

impl<'a> IntoIterator for &'a SequenceSet {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequences.iter()
    }
}
