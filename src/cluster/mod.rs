//! Clustering strategies over the near-neighbor graph.
//!
//! Every strategy turns the same candidate relation into a partition of the
//! unique sequences with one canonical member per cluster:
//!
//! - `components`: connected components (transitive closure), union-find.
//! - `mp`: iterative message passing towards the best-supported neighbor.
//! - `spheres`: greedy count-ordered ball covering.

pub mod components;
pub mod message_passing;
pub mod spheres;
pub mod union_find;

pub use components::Components;
pub use message_passing::{MessagePassing, SupportSnapshot};
pub use spheres::Spheres;
pub use union_find::DisjointSets;

use crate::config::ClusterParams;
use crate::error::{ClusterError, ClusterWarning, Result};
use crate::graph::NeighborGraph;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available clustering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum ClusterAlgorithm {
    /// Connected components of the candidate graph.
    #[serde(rename = "components")]
    #[value(name = "components")]
    Components,
    /// Message passing towards the best-supported neighbor.
    #[serde(rename = "mp")]
    #[value(name = "mp")]
    MessagePassing,
    /// Greedy count-ordered sphere covering.
    #[serde(rename = "spheres")]
    #[value(name = "spheres")]
    Spheres,
}

impl ClusterAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterAlgorithm::Components => "components",
            ClusterAlgorithm::MessagePassing => "mp",
            ClusterAlgorithm::Spheres => "spheres",
        }
    }

    /// Instantiates the strategy with the run parameters.
    pub fn strategy(&self, params: &ClusterParams) -> Box<dyn ClusteringStrategy> {
        match self {
            ClusterAlgorithm::Components => Box::new(Components::new(params.tie_break)),
            ClusterAlgorithm::MessagePassing => Box::new(MessagePassing::new(params.max_rounds)),
            ClusterAlgorithm::Spheres => Box::new(Spheres::new(params.ratio)),
        }
    }
}

impl fmt::Display for ClusterAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusterAlgorithm {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "components" | "connected-components" => Ok(ClusterAlgorithm::Components),
            "mp" | "message-passing" => Ok(ClusterAlgorithm::MessagePassing),
            "spheres" | "sphere" => Ok(ClusterAlgorithm::Spheres),
            other => Err(ClusterError::InvalidParameter(format!(
                "unknown clustering algorithm '{}' (expected components, mp or spheres)",
                other
            ))),
        }
    }
}

/// How `components` picks the canonical among members with the highest count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Smallest sequence index.
    SmallestIndex,
    /// Most candidate edges, then smallest sequence index.
    MostNeighbors,
}

/// One cluster of unique sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    /// Index of the canonical sequence; always one of `members`.
    pub canonical: usize,
    /// Member indices, ascending.
    pub members: Vec<usize>,
}

/// Output of a clustering strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    /// Clusters ordered by their smallest member index.
    pub clusters: Vec<Cluster>,
    /// Message-passing rounds executed, if applicable.
    pub rounds: Option<usize>,
    pub warnings: Vec<ClusterWarning>,
}

impl Partition {
    /// Groups nodes by canonical label: `labels[i]` is the canonical of node `i`.
    pub fn from_labels(labels: &[usize]) -> Self {
        let mut groups: IndexMap<usize, Vec<usize>> = IndexMap::new();
        for (node, &canonical) in labels.iter().enumerate() {
            groups.entry(canonical).or_default().push(node);
        }
        Partition {
            clusters: groups
                .into_iter()
                .map(|(canonical, members)| Cluster { canonical, members })
                .collect(),
            rounds: None,
            warnings: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// A clustering algorithm over the near-neighbor graph.
pub trait ClusteringStrategy: Send + Sync {
    fn algorithm(&self) -> ClusterAlgorithm;

    /// Partitions the nodes of `graph`. `counts[i]` is the multiplicity of
    /// sequence `i`.
    fn partition(&self, graph: &NeighborGraph, counts: &[u64]) -> Result<Partition>;
}

/// Shared precondition of every strategy.
fn check_inputs(graph: &NeighborGraph, counts: &[u64]) -> Result<()> {
    if graph.len() != counts.len() {
        return Err(ClusterError::InvariantViolation(format!(
            "graph has {} nodes but {} counts were given",
            graph.len(),
            counts.len()
        )));
    }
    Ok(())
}
