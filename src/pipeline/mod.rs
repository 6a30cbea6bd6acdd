//! End-to-end clustering run.
//!
//! A run moves through `Unprocessed → Indexed → CandidatesBuilt →
//! Partitioned → Aggregated`. Each stage is a type, so a stage can only be
//! entered from the one before it. Stages log their sizes and timings at
//! `info` and record them in [`RunStats`].

pub mod report;

pub use report::generate_report;

use crate::aggregate::{aggregate, ClusterOutput};
use crate::bio::SequenceSet;
use crate::cluster::{ClusterAlgorithm, Partition};
use crate::config::{ClusterConfig, ClusterParams};
use crate::error::{ClusterWarning, Result};
use crate::graph::{collect_candidate_pairs, NeighborGraph};
use crate::index::Trie;
use crate::utils::parallel::ParallelExecutor;
use log::info;
use serde::Serialize;
use std::time::Instant;

/// Sizes and timings of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub input_records: usize,
    pub unique_sequences: usize,
    pub tau: usize,
    pub algorithm: Option<ClusterAlgorithm>,
    pub threads: usize,
    pub trie_height: usize,
    pub candidate_pairs: usize,
    pub clusters: usize,
    /// Message-passing rounds executed.
    pub rounds: Option<usize>,
    pub index_secs: f64,
    pub candidates_secs: f64,
    pub partition_secs: f64,
    pub aggregate_secs: f64,
}

impl RunStats {
    pub fn total_secs(&self) -> f64 {
        self.index_secs + self.candidates_secs + self.partition_secs + self.aggregate_secs
    }
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringReport {
    pub output: ClusterOutput,
    pub warnings: Vec<ClusterWarning>,
    pub stats: RunStats,
}

pub struct Unprocessed;

pub struct Indexed {
    trie: Trie,
}

pub struct CandidatesBuilt {
    graph: NeighborGraph,
}

pub struct Partitioned {
    partition: Partition,
}

pub struct Aggregated {
    output: ClusterOutput,
    warnings: Vec<ClusterWarning>,
}

/// A clustering run in stage `S`.
pub struct Pipeline<S> {
    sequences: SequenceSet,
    params: ClusterParams,
    executor: ParallelExecutor,
    stats: RunStats,
    state: S,
}

impl<S> Pipeline<S> {
    pub fn sequences(&self) -> &SequenceSet {
        &self.sequences
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    fn advance<T>(self, state: T) -> Pipeline<T> {
        Pipeline {
            sequences: self.sequences,
            params: self.params,
            executor: self.executor,
            stats: self.stats,
            state,
        }
    }
}

impl Pipeline<Unprocessed> {
    /// Validates `config` against the input and sets up the worker pool.
    pub fn new(sequences: SequenceSet, config: &ClusterConfig) -> Result<Self> {
        let params = config.resolve(&sequences)?;
        let executor = ParallelExecutor::new(Some(config.parallel()))?;

        let stats = RunStats {
            input_records: sequences.n_records(),
            unique_sequences: sequences.len(),
            tau: params.tau,
            algorithm: Some(params.algorithm),
            threads: executor.threads(),
            ..Default::default()
        };
        info!(
            "Clustering {} records ({} unique) with tau = {}, algorithm = {}, {} threads",
            stats.input_records, stats.unique_sequences, params.tau, params.algorithm, stats.threads
        );

        Ok(Pipeline {
            sequences,
            params,
            executor,
            stats,
            state: Unprocessed,
        })
    }

    /// Builds the trie over all unique sequences.
    pub fn index(mut self) -> Result<Pipeline<Indexed>> {
        let start = Instant::now();
        let shards = self.executor.threads();
        let trie = {
            let sequences = &self.sequences;
            self.executor.install(|| Trie::build_sharded(sequences, shards))
        };

        self.stats.trie_height = trie.height();
        self.stats.index_secs = start.elapsed().as_secs_f64();
        info!(
            "Indexed {} sequences (height {}) in {:.2} seconds",
            trie.len(),
            trie.height(),
            self.stats.index_secs
        );
        Ok(self.advance(Indexed { trie }))
    }
}

impl Pipeline<Indexed> {
    pub fn trie(&self) -> &Trie {
        &self.state.trie
    }

    /// Queries every sequence against the trie and builds the neighbor graph.
    /// The trie is dropped afterwards.
    pub fn build_candidates(mut self) -> Result<Pipeline<CandidatesBuilt>> {
        let start = Instant::now();
        let chunk_size = self.executor.config().chunk_size;
        let pairs = {
            let (trie, sequences, tau) = (&self.state.trie, &self.sequences, self.params.tau);
            self.executor
                .install(|| collect_candidate_pairs(trie, sequences, tau, chunk_size))?
        };
        let graph = NeighborGraph::from_pairs(self.sequences.len(), pairs)?;

        self.stats.candidate_pairs = graph.n_edges();
        self.stats.candidates_secs = start.elapsed().as_secs_f64();
        info!(
            "Found {} candidate pairs in {:.2} seconds",
            graph.n_edges(),
            self.stats.candidates_secs
        );
        Ok(self.advance(CandidatesBuilt { graph }))
    }
}

impl Pipeline<CandidatesBuilt> {
    pub fn graph(&self) -> &NeighborGraph {
        &self.state.graph
    }

    /// Runs the configured clustering strategy.
    pub fn partition(mut self) -> Result<Pipeline<Partitioned>> {
        let start = Instant::now();
        let strategy = self.params.algorithm.strategy(&self.params);
        let counts = self.sequences.counts();
        let partition = {
            let graph = &self.state.graph;
            self.executor.install(|| strategy.partition(graph, &counts))?
        };

        self.stats.rounds = partition.rounds;
        self.stats.partition_secs = start.elapsed().as_secs_f64();
        info!(
            "{} produced {} clusters in {:.2} seconds",
            strategy.algorithm(),
            partition.len(),
            self.stats.partition_secs
        );
        Ok(self.advance(Partitioned { partition }))
    }
}

impl Pipeline<Partitioned> {
    pub fn partition_result(&self) -> &Partition {
        &self.state.partition
    }

    /// Sums counts per cluster and maps members back to input records.
    pub fn aggregate(mut self) -> Result<Pipeline<Aggregated>> {
        let start = Instant::now();
        let output = aggregate(&self.state.partition, &self.sequences)?;
        let warnings = std::mem::take(&mut self.state.partition.warnings);

        self.stats.clusters = output.len();
        self.stats.aggregate_secs = start.elapsed().as_secs_f64();
        info!(
            "Aggregated {} clusters in {:.2} seconds",
            output.len(),
            self.stats.aggregate_secs
        );
        Ok(self.advance(Aggregated { output, warnings }))
    }
}

impl Pipeline<Aggregated> {
    pub fn output(&self) -> &ClusterOutput {
        &self.state.output
    }

    pub fn warnings(&self) -> &[ClusterWarning] {
        &self.state.warnings
    }

    pub fn into_report(self) -> ClusteringReport {
        ClusteringReport {
            output: self.state.output,
            warnings: self.state.warnings,
            stats: self.stats,
        }
    }
}

/// Runs every stage on `sequences`.
pub fn cluster_sequences(sequences: SequenceSet, config: &ClusterConfig) -> Result<ClusteringReport> {
    let report = Pipeline::new(sequences, config)?
        .index()?
        .build_candidates()?
        .partition()?
        .aggregate()?
        .into_report();
    info!(
        "Finished in {:.2} seconds: {} clusters",
        report.stats.total_secs(),
        report.stats.clusters
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClusterError;

    fn config(tau: i64, algorithm: ClusterAlgorithm) -> ClusterConfig {
        ClusterConfig {
            tau: Some(tau),
            algorithm,
            threads: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_stages_in_order() {
        let seqs = SequenceSet::from_reads(["AAAA", "AAAT", "AAAA", "GGGG"]).unwrap();
        let indexed = Pipeline::new(seqs, &config(1, ClusterAlgorithm::Components))
            .unwrap()
            .index()
            .unwrap();
        assert_eq!(indexed.trie().len(), 3);

        let built = indexed.build_candidates().unwrap();
        assert_eq!(built.graph().n_edges(), 1);

        let partitioned = built.partition().unwrap();
        assert_eq!(partitioned.partition_result().len(), 2);

        let done = partitioned.aggregate().unwrap();
        assert_eq!(done.output().canonical_counts().get("AAAA"), Some(&3));
        assert_eq!(done.stats().candidate_pairs, 1);
        assert_eq!(done.stats().clusters, 2);
        assert_eq!(done.stats().input_records, 4);
        assert_eq!(done.stats().unique_sequences, 3);
    }

    #[test]
    fn test_empty_input() {
        let seqs = SequenceSet::from_reads(Vec::<&str>::new()).unwrap();
        for algorithm in [
            ClusterAlgorithm::Components,
            ClusterAlgorithm::MessagePassing,
            ClusterAlgorithm::Spheres,
        ] {
            let report = cluster_sequences(seqs.clone(), &config(2, algorithm)).unwrap();
            assert!(report.output.is_empty());
            assert!(report.warnings.is_empty());
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_indexing() {
        let seqs = SequenceSet::from_reads(["AAAA"]).unwrap();
        let result = Pipeline::new(seqs, &config(-1, ClusterAlgorithm::Spheres));
        assert!(matches!(result, Err(ClusterError::InvalidParameter(_))));
    }

    #[test]
    fn test_non_convergence_surfaces_in_report() {
        let seqs = SequenceSet::from_counts([("AAAA", 10), ("AAAT", 3), ("AATT", 1)]).unwrap();
        let config = ClusterConfig {
            max_rounds: 1,
            ..config(1, ClusterAlgorithm::MessagePassing)
        };
        let report = cluster_sequences(seqs, &config).unwrap();
        assert_eq!(
            report.warnings,
            vec![ClusterWarning::NonConvergence { rounds: 1 }]
        );
        assert_eq!(report.stats.rounds, Some(1));
        assert_eq!(report.output.total_count(), 14);
    }
}
