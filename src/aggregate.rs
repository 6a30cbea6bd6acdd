//! Aggregation of a partition into the reported clusters.
//!
//! Sums member counts per cluster and expands members back to the original
//! input records. The partition is checked first: every unique sequence must
//! be in exactly one cluster and every canonical must be one of its members.

use crate::bio::SequenceSet;
use crate::cluster::Partition;
use crate::error::{ClusterError, Result};
use indexmap::IndexMap;
use serde::Serialize;

/// One reported cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterRecord {
    /// Canonical sequence.
    pub canonical: String,
    /// Summed count of all members.
    pub count: u64,
    /// Member sequences, one per input record, in input order.
    pub members: Vec<String>,
    /// 0-based input positions of the member records, ascending.
    pub ids: Vec<usize>,
}

/// Clusters in output order: decreasing count, ties by canonical sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterOutput {
    pub clusters: Vec<ClusterRecord>,
}

impl ClusterOutput {
    /// Canonical sequence -> aggregate count.
    pub fn canonical_counts(&self) -> IndexMap<String, u64> {
        self.clusters
            .iter()
            .map(|c| (c.canonical.clone(), c.count))
            .collect()
    }

    /// Canonical sequence -> member sequences in input order.
    pub fn members(&self) -> IndexMap<String, Vec<String>> {
        self.clusters
            .iter()
            .map(|c| (c.canonical.clone(), c.members.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn total_count(&self) -> u64 {
        self.clusters.iter().map(|c| c.count).sum()
    }

    pub fn get(&self, canonical: &str) -> Option<&ClusterRecord> {
        self.clusters.iter().find(|c| c.canonical == canonical)
    }
}

/// Checks that `partition` covers every sequence exactly once.
pub fn check_partition(partition: &Partition, sequences: &SequenceSet) -> Result<()> {
    let n = sequences.len();
    let mut owner: Vec<Option<usize>> = vec![None; n];

    for (cluster_index, cluster) in partition.clusters.iter().enumerate() {
        if cluster.members.is_empty() {
            return Err(ClusterError::InvariantViolation(format!(
                "cluster {} has no members",
                cluster_index
            )));
        }
        if !cluster.members.contains(&cluster.canonical) {
            return Err(ClusterError::InvariantViolation(format!(
                "canonical {} is not a member of cluster {}",
                cluster.canonical, cluster_index
            )));
        }
        for &member in &cluster.members {
            if member >= n {
                return Err(ClusterError::InvariantViolation(format!(
                    "cluster {} names sequence {} but only {} exist",
                    cluster_index, member, n
                )));
            }
            if let Some(previous) = owner[member].replace(cluster_index) {
                return Err(ClusterError::InvariantViolation(format!(
                    "sequence {} is in clusters {} and {}",
                    member, previous, cluster_index
                )));
            }
        }
    }

    if let Some(missing) = owner.iter().position(Option::is_none) {
        return Err(ClusterError::InvariantViolation(format!(
            "sequence {} is in no cluster",
            missing
        )));
    }
    Ok(())
}

/// Builds the reported clusters from a checked partition.
pub fn aggregate(partition: &Partition, sequences: &SequenceSet) -> Result<ClusterOutput> {
    check_partition(partition, sequences)?;

    let mut clusters: Vec<ClusterRecord> = partition
        .clusters
        .iter()
        .map(|cluster| {
            let count = cluster
                .members
                .iter()
                .try_fold(0u64, |acc, &m| acc.checked_add(sequences[m].count))
                .ok_or_else(|| {
                    ClusterError::InvariantViolation(format!(
                        "count of the cluster of sequence {} overflows",
                        cluster.canonical
                    ))
                })?;

            let mut records: Vec<(usize, &str)> = cluster
                .members
                .iter()
                .flat_map(|&m| {
                    let seq = &sequences[m];
                    seq.ids.iter().map(move |&id| (id, seq.text.as_str()))
                })
                .collect();
            records.sort_unstable_by_key(|&(id, _)| id);

            Ok(ClusterRecord {
                canonical: sequences[cluster.canonical].text.clone(),
                count,
                members: records.iter().map(|&(_, text)| text.to_string()).collect(),
                ids: records.iter().map(|&(id, _)| id).collect(),
            })
        })
        .collect::<Result<_>>()?;

    clusters.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.canonical.cmp(&b.canonical)));

    let output = ClusterOutput { clusters };
    if output.total_count() != sequences.total_count() {
        return Err(ClusterError::InvariantViolation(format!(
            "aggregate count {} differs from input count {}",
            output.total_count(),
            sequences.total_count()
        )));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Cluster;

    fn partition(clusters: Vec<(usize, Vec<usize>)>) -> Partition {
        Partition {
            clusters: clusters
                .into_iter()
                .map(|(canonical, members)| Cluster { canonical, members })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_counts_and_members() {
        let seqs = SequenceSet::from_reads(["AAAA", "GGGG", "AAAT", "AAAA"]).unwrap();
        // Unique order: AAAA(0, ids 0,3), GGGG(1), AAAT(2)
        let output = aggregate(&partition(vec![(0, vec![0, 2]), (1, vec![1])]), &seqs).unwrap();

        assert_eq!(output.canonical_counts().get("AAAA"), Some(&3));
        assert_eq!(output.canonical_counts().get("GGGG"), Some(&1));
        assert_eq!(
            output.members().get("AAAA").unwrap(),
            &vec!["AAAA".to_string(), "AAAT".to_string(), "AAAA".to_string()]
        );
        assert_eq!(output.clusters[0].ids, vec![0, 2, 3]);
        assert_eq!(
            output.canonical_counts().keys().collect::<Vec<_>>(),
            output.members().keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_largest_counts_sum_exactly() {
        let seqs = SequenceSet::from_counts([("AAAA", u64::MAX - 7), ("AAAT", 7)]).unwrap();
        let output = aggregate(&partition(vec![(0, vec![0, 1])]), &seqs).unwrap();
        assert_eq!(output.clusters[0].count, u64::MAX);
    }

    #[test]
    fn test_output_order() {
        let seqs = SequenceSet::from_counts([("TT", 2), ("CC", 5), ("AA", 2)]).unwrap();
        let output =
            aggregate(&partition(vec![(0, vec![0]), (1, vec![1]), (2, vec![2])]), &seqs).unwrap();
        let order: Vec<_> = output.clusters.iter().map(|c| c.canonical.as_str()).collect();
        assert_eq!(order, vec!["CC", "AA", "TT"]);
    }

    #[test]
    fn test_missing_sequence_detected() {
        let seqs = SequenceSet::from_reads(["AA", "CC", "GG"]).unwrap();
        let err = aggregate(&partition(vec![(0, vec![0, 1])]), &seqs).unwrap_err();
        assert!(matches!(err, ClusterError::InvariantViolation(_)));
    }

    #[test]
    fn test_duplicated_sequence_detected() {
        let seqs = SequenceSet::from_reads(["AA", "CC"]).unwrap();
        let err = aggregate(&partition(vec![(0, vec![0, 1]), (1, vec![1])]), &seqs).unwrap_err();
        assert!(matches!(err, ClusterError::InvariantViolation(_)));
    }

    #[test]
    fn test_foreign_canonical_detected() {
        let seqs = SequenceSet::from_reads(["AA", "CC"]).unwrap();
        let err = aggregate(&partition(vec![(1, vec![0]), (1, vec![1])]), &seqs).unwrap_err();
        assert!(matches!(err, ClusterError::InvariantViolation(_)));
    }

    #[test]
    fn test_empty() {
        let seqs = SequenceSet::from_reads(Vec::<&str>::new()).unwrap();
        let output = aggregate(&Partition::default(), &seqs).unwrap();
        assert!(output.is_empty());
        assert!(output.canonical_counts().is_empty());
        assert!(output.members().is_empty());
    }
}
