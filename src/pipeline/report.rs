//! Human-readable summary of a clustering run.

use super::ClusteringReport;

/// Number of largest clusters listed in the summary.
const TOP_CLUSTERS: usize = 10;

/// Renders the run statistics, warnings and the largest clusters as text.
pub fn generate_report(report: &ClusteringReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    out.push_str("Barcode Clustering Report\n");
    out.push_str("=========================\n\n");

    out.push_str("Input:\n");
    out.push_str(&format!("  Records: {}\n", stats.input_records));
    out.push_str(&format!(
        "  Unique sequences: {} ({:.1}% of records)\n",
        stats.unique_sequences,
        100.0 * stats.unique_sequences as f64 / stats.input_records.max(1) as f64
    ));
    out.push('\n');

    out.push_str("Parameters:\n");
    out.push_str(&format!("  Max distance (tau): {}\n", stats.tau));
    match stats.algorithm {
        Some(algorithm) => out.push_str(&format!("  Algorithm: {}\n", algorithm)),
        None => out.push_str("  Algorithm: N/A\n"),
    }
    out.push_str(&format!("  Threads: {}\n\n", stats.threads));

    out.push_str("Results:\n");
    out.push_str(&format!("  Candidate pairs: {}\n", stats.candidate_pairs));
    out.push_str(&format!("  Clusters: {}\n", stats.clusters));
    if let Some(rounds) = stats.rounds {
        out.push_str(&format!("  Message-passing rounds: {}\n", rounds));
    }
    out.push('\n');

    out.push_str("Timings (seconds):\n");
    out.push_str(&format!("  Index: {:.3}\n", stats.index_secs));
    out.push_str(&format!("  Candidates: {:.3}\n", stats.candidates_secs));
    out.push_str(&format!("  Partition: {:.3}\n", stats.partition_secs));
    out.push_str(&format!("  Aggregate: {:.3}\n", stats.aggregate_secs));
    out.push_str(&format!("  Total: {:.3}\n\n", stats.total_secs()));

    if !report.warnings.is_empty() {
        out.push_str("Warnings:\n");
        for warning in &report.warnings {
            out.push_str(&format!("  {}\n", warning));
        }
        out.push('\n');
    }

    if report.output.is_empty() {
        out.push_str("Largest clusters: none\n");
    } else {
        out.push_str("Largest clusters:\n");
        for cluster in report.output.clusters.iter().take(TOP_CLUSTERS) {
            out.push_str(&format!(
                "  {}\t{}\t({} records)\n",
                cluster.canonical,
                cluster.count,
                cluster.members.len()
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{ClusterOutput, ClusterRecord};
    use crate::cluster::ClusterAlgorithm;
    use crate::error::ClusterWarning;
    use crate::pipeline::RunStats;

    fn report(warnings: Vec<ClusterWarning>) -> ClusteringReport {
        ClusteringReport {
            output: ClusterOutput {
                clusters: vec![ClusterRecord {
                    canonical: "ACGT".to_string(),
                    count: 5,
                    members: vec!["ACGT".to_string(); 5],
                    ids: (0..5).collect(),
                }],
            },
            warnings,
            stats: RunStats {
                input_records: 5,
                unique_sequences: 1,
                tau: 2,
                algorithm: Some(ClusterAlgorithm::MessagePassing),
                threads: 1,
                clusters: 1,
                rounds: Some(1),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_report_sections() {
        let text = generate_report(&report(Vec::new()));
        assert!(text.contains("Records: 5"));
        assert!(text.contains("Algorithm: mp"));
        assert!(text.contains("Message-passing rounds: 1"));
        assert!(text.contains("ACGT\t5\t(5 records)"));
        assert!(!text.contains("Warnings:"));
    }

    #[test]
    fn test_report_lists_warnings() {
        let text = generate_report(&report(vec![ClusterWarning::NonConvergence { rounds: 7 }]));
        assert!(text.contains("Warnings:"));
        assert!(text.contains("did not converge after 7 rounds"));
    }
}
