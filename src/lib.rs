//! Clustering of short sequencing barcodes by bounded edit distance.
//!
//! Sequences are indexed in a trie, every pair within distance τ is found
//! by a pruned trie search, and the resulting neighbor graph is partitioned
//! by one of three strategies (connected components, message passing or
//! sphere covering). Each cluster is reported as one canonical sequence with
//! the summed count of its members.
//!
//! ```no_run
//! use barcode_collapse::{cluster_sequences, ClusterAlgorithm, ClusterConfig, SequenceSet};
//!
//! let reads = SequenceSet::from_reads(["ACGTACGT", "ACGTACGA", "TTTTCCCC"])?;
//! let config = ClusterConfig {
//!     tau: Some(1),
//!     algorithm: ClusterAlgorithm::MessagePassing,
//!     ..Default::default()
//! };
//! let report = cluster_sequences(reads, &config)?;
//! for (canonical, count) in report.output.canonical_counts() {
//!     println!("{}\t{}", canonical, count);
//! }
//! # Ok::<(), barcode_collapse::ClusterError>(())
//! ```

pub mod aggregate;
pub mod bio;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod io;
pub mod pipeline;
pub mod utils;

pub use aggregate::{aggregate, ClusterOutput, ClusterRecord};
pub use bio::{Sequence, SequenceSet};
pub use cluster::{ClusterAlgorithm, ClusteringStrategy, Partition, TieBreak};
pub use config::{ClusterConfig, ClusterParams};
pub use error::{ClusterError, ClusterWarning, Result};
pub use graph::{CandidatePair, NeighborGraph};
pub use index::Trie;
pub use pipeline::{cluster_sequences, ClusteringReport, Pipeline, RunStats};
