//! Run configuration.
//!
//! [`ClusterConfig`] is what the user supplies (CLI flags or a JSON file).
//! [`ClusterConfig::resolve`] validates it and turns it into the
//! [`ClusterParams`] the engine runs with, deriving τ from the data when it
//! was not given.

use crate::bio::SequenceSet;
use crate::cluster::{ClusterAlgorithm, TieBreak};
use crate::error::{ClusterError, Result};
use crate::index::Distance;
use crate::utils::parallel::ParallelConfig;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// τ used when the median sequence length is above 160, and the largest τ
/// accepted without a warning.
pub const MAX_AUTO_TAU: usize = 8;

/// User-facing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    /// Maximum edit distance. `None` derives it from the median sequence length.
    pub tau: Option<i64>,
    /// Clustering strategy.
    pub algorithm: ClusterAlgorithm,
    /// Minimum count ratio of a sphere center over an absorbed member.
    pub ratio: f64,
    /// Round cap for message passing.
    pub max_rounds: usize,
    /// Canonical tie-break for connected components.
    pub tie_break: TieBreak,
    /// Worker threads; 0 uses all logical CPUs.
    pub threads: usize,
    /// Minimum work unit for parallel loops.
    pub chunk_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            tau: None,
            algorithm: ClusterAlgorithm::MessagePassing,
            ratio: 1.0,
            max_rounds: 100,
            tie_break: TieBreak::SmallestIndex,
            threads: 0,
            chunk_size: 256,
        }
    }
}

impl ClusterConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    ///
    /// Well-formed JSON holding an unusable value (unknown algorithm, wrong
    /// type, unknown key) is reported as `InvalidParameter`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            if e.is_data() {
                ClusterError::InvalidParameter(e.to_string())
            } else {
                ClusterError::Json(e)
            }
        })
    }

    /// Checks every parameter that can be checked without looking at the data.
    pub fn validate(&self) -> Result<()> {
        if let Some(tau) = self.tau {
            if tau < 0 {
                return Err(ClusterError::InvalidParameter(format!(
                    "tau must be non-negative, got {}",
                    tau
                )));
            }
            if tau > i64::from(Distance::MAX) {
                return Err(ClusterError::InvalidParameter(format!(
                    "tau must be at most {}, got {}",
                    Distance::MAX,
                    tau
                )));
            }
        }
        if !self.ratio.is_finite() || self.ratio <= 0.0 {
            return Err(ClusterError::InvalidParameter(format!(
                "ratio must be a positive number, got {}",
                self.ratio
            )));
        }
        if self.max_rounds == 0 {
            return Err(ClusterError::InvalidParameter(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ClusterError::InvalidParameter(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the configuration and fixes τ for this input.
    pub fn resolve(&self, sequences: &SequenceSet) -> Result<ClusterParams> {
        self.validate()?;

        let tau = match self.tau {
            Some(tau) => {
                let tau = tau as usize;
                if tau > MAX_AUTO_TAU {
                    warn!(
                        "tau = {} is unusually large; the trie search degrades towards all-pairs comparison",
                        tau
                    );
                }
                tau
            }
            None => {
                let tau = auto_tau(sequences.median_len().unwrap_or(0));
                info!("Setting tau to {} from the median sequence length", tau);
                tau
            }
        };

        Ok(ClusterParams {
            tau,
            algorithm: self.algorithm,
            ratio: self.ratio,
            max_rounds: self.max_rounds,
            tie_break: self.tie_break,
        })
    }

    pub fn parallel(&self) -> ParallelConfig {
        ParallelConfig::new(self.threads, self.chunk_size)
    }
}

/// τ derived from the median sequence length.
pub fn auto_tau(median_len: usize) -> usize {
    if median_len > 160 {
        MAX_AUTO_TAU
    } else {
        2 + median_len / 30
    }
}

/// Validated parameters of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterParams {
    pub tau: usize,
    pub algorithm: ClusterAlgorithm,
    pub ratio: f64,
    pub max_rounds: usize,
    pub tie_break: TieBreak,
}
