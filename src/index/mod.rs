//! Approximate-match index: a trie over all unique sequences and the bounded
//! edit-distance recurrence evaluated while descending it.

pub mod distance;
pub mod trie;

pub use distance::{Distance, DpRow};
pub use trie::{Neighbors, Trie, TrieNode};
