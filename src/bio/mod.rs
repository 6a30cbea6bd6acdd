//! Sequence alphabet and the sequence model.
//!
//! Sequences are strings over {A,C,G,T,N}. `N` is a wildcard that matches
//! any symbol at zero substitution cost. Internally every symbol is stored as
//! a small integer code so trie children can be indexed directly.

pub mod sequence;

pub use sequence::{Sequence, SequenceSet};

use crate::error::{ClusterError, Result};

/// Recognized symbols, in code order.
pub const ALPHABET: &[u8] = b"ACGTN";

/// Number of distinct symbol codes.
pub const ALPHABET_SIZE: usize = ALPHABET.len();

/// Code of the wildcard symbol `N`.
pub const WILDCARD: u8 = 4;

/// Maps a byte to its symbol code. Case-insensitive.
pub fn symbol_code(base: u8) -> Option<u8> {
    match base.to_ascii_uppercase() {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        b'N' => Some(WILDCARD),
        _ => None,
    }
}

/// Encodes a sequence into symbol codes.
///
/// `sequence_index` is only used to label the error when an unrecognized
/// symbol is found.
pub fn encode(seq: &[u8], sequence_index: usize) -> Result<Vec<u8>> {
    seq.iter()
        .enumerate()
        .map(|(position, &base)| {
            symbol_code(base).ok_or(ClusterError::InvalidSymbol {
                sequence: sequence_index,
                position,
                symbol: base as char,
            })
        })
        .collect()
}

/// Decodes symbol codes back into upper-case text.
pub fn decode(codes: &[u8]) -> String {
    codes.iter().map(|&c| ALPHABET[c as usize] as char).collect()
}

/// Substitution cost between two symbol codes. The wildcard matches anything.
#[inline]
pub fn substitution_cost(a: u8, b: u8) -> u32 {
    if a == b || a == WILDCARD || b == WILDCARD {
        0
    } else {
        1
    }
}
