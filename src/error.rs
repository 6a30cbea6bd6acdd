//! Error taxonomy for the clustering engine.
//!
//! Fatal conditions are variants of [`ClusterError`]. Non-convergence of the
//! message-passing strategy is not fatal and is reported as a
//! [`ClusterWarning`] alongside the result instead.

use crate::utils::parallel::ParallelError;
use serde::Serialize;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("invalid symbol '{symbol}' at position {position} of sequence {sequence}")]
    InvalidSymbol {
        sequence: usize,
        position: usize,
        symbol: char,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("FASTA/FASTQ parsing error: {0}")]
    Fastx(#[from] needletail::errors::ParseError),

    #[error("malformed input at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Parallel(#[from] ParallelError),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

/// Conditions that do not abort a run but should be surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClusterWarning {
    /// Message passing hit its round cap; the last pointer assignment was used.
    NonConvergence { rounds: usize },
}

impl std::fmt::Display for ClusterWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterWarning::NonConvergence { rounds } => {
                write!(f, "message passing did not converge after {} rounds", rounds)
            }
        }
    }
}
