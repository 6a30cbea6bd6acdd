//! Bounded edit distance, evaluated one trie level at a time.
//!
//! A [`DpRow`] is the row of the classical Levenshtein table for a trie path
//! against a fixed query: entry `j` is the distance between the path and the
//! first `j` query symbols. Descending to a child extends the path by one
//! symbol, which only needs the parent's row.

use crate::bio::substitution_cost;

/// Edit distance value.
pub type Distance = u32;

/// One row of the dynamic-programming table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpRow(Vec<Distance>);

impl DpRow {
    /// Row for the empty path: aligning nothing against `j` query symbols costs `j`.
    pub fn initial(query_len: usize) -> Self {
        DpRow((0..=query_len as Distance).collect())
    }

    /// Row for the path extended by `symbol`.
    pub fn extend(&self, symbol: u8, query: &[u8]) -> Self {
        let prev = &self.0;
        debug_assert_eq!(prev.len(), query.len() + 1);

        let mut row = Vec::with_capacity(prev.len());
        row.push(prev[0] + 1);
        for j in 1..prev.len() {
            let substitute = prev[j - 1] + substitution_cost(symbol, query[j - 1]);
            let delete = prev[j] + 1;
            let insert = row[j - 1] + 1;
            row.push(substitute.min(delete).min(insert));
        }
        DpRow(row)
    }

    /// Distance between the path and the whole query.
    pub fn last(&self) -> Distance {
        self.0[self.0.len() - 1]
    }

    /// Lower bound on the distance between the query and any sequence that
    /// extends this path by between `min_tail` and `max_tail` symbols.
    ///
    /// From cell `j`, reaching the end of both strings needs at least
    /// `|tail - (m - j)|` insertions or deletions.
    pub fn lower_bound(&self, min_tail: usize, max_tail: usize) -> Distance {
        let m = self.0.len() - 1;
        self.0
            .iter()
            .enumerate()
            .map(|(j, &cost)| {
                let remaining = m - j;
                let gap = if remaining < min_tail {
                    min_tail - remaining
                } else if remaining > max_tail {
                    remaining - max_tail
                } else {
                    0
                };
                cost + gap as Distance
            })
            .min()
            .unwrap_or(Distance::MAX)
    }
}

/// Full-table edit distance between two encoded sequences.
///
/// Brute-force reference used to validate the trie search.
#[cfg(test)]
pub(crate) fn brute_force_distance(a: &[u8], b: &[u8]) -> Distance {
    let mut row = DpRow::initial(b.len());
    for &symbol in a {
        row = row.extend(symbol, b);
    }
    row.last()
}
