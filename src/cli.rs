use crate::cluster::{ClusterAlgorithm, TieBreak};
use crate::config::ClusterConfig;
use crate::io::{read_sequences, write_clusters_to, OutputFormat, WriteOptions};
use crate::pipeline::{cluster_sequences, generate_report};
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

/// Collapse sequencing barcodes that are within a small edit distance of
/// each other and report one canonical sequence per cluster.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file (raw sequences with optional TAB count, FASTA or FASTQ). Reads stdin if omitted.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output file. Writes stdout if omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum edit distance (tau). Derived from the median sequence length if omitted.
    #[arg(short = 'd', long, allow_negative_numbers = true)]
    pub distance: Option<i64>,

    /// Clustering algorithm.
    #[arg(short = 'c', long, value_enum)]
    pub cluster_algorithm: Option<ClusterAlgorithm>,

    /// Minimum count ratio of a sphere center over the members it absorbs.
    #[arg(short = 'r', long)]
    pub cluster_ratio: Option<f64>,

    /// Round cap for message passing.
    #[arg(long)]
    pub max_rounds: Option<usize>,

    /// Canonical tie-break for connected components.
    #[arg(long, value_enum)]
    pub tie_break: Option<TieBreak>,

    /// Number of threads (0 = all logical CPUs).
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// JSON configuration file; command-line flags take precedence over it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write the member sequences of every cluster.
    #[arg(long)]
    pub print_clusters: bool,

    /// Also write the 1-based input ids of every cluster's members.
    #[arg(long)]
    pub seq_id: bool,

    /// Write only the canonical sequences. Incompatible with --print-clusters and --seq-id.
    #[arg(long)]
    pub non_redundant: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
    pub format: OutputFormat,

    /// Log progress and print a run summary to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Configuration file (if any) with command-line overrides applied.
    pub fn cluster_config(&self) -> Result<ClusterConfig> {
        let mut config = match &self.config {
            Some(path) => ClusterConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => ClusterConfig::default(),
        };

        if let Some(distance) = self.distance {
            config.tau = Some(distance);
        }
        if let Some(algorithm) = self.cluster_algorithm {
            config.algorithm = algorithm;
        }
        if let Some(ratio) = self.cluster_ratio {
            config.ratio = ratio;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        if let Some(tie_break) = self.tie_break {
            config.tie_break = tie_break;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }

        if config.algorithm != ClusterAlgorithm::Spheres && self.cluster_ratio.is_some() {
            warn!("--cluster-ratio only affects the spheres algorithm");
        }
        Ok(config)
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            format: self.format,
            print_clusters: self.print_clusters,
            seq_id: self.seq_id,
            non_redundant: self.non_redundant,
        }
    }
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.cluster_config()?;
    config.validate().context("Invalid clustering parameters")?;
    let write_options = cli.write_options();
    write_options.validate().context("Invalid output options")?;

    let sequences = read_sequences(cli.input.as_deref()).with_context(|| match &cli.input {
        Some(path) => format!("Failed to read sequences from {}", path.display()),
        None => "Failed to read sequences from stdin".to_string(),
    })?;

    let report = cluster_sequences(sequences, &config).context("Clustering failed")?;

    write_clusters_to(&report.output, cli.output.as_deref(), &write_options)
        .context("Failed to write clusters")?;
    if let Some(path) = &cli.output {
        info!("Wrote {} clusters to {}", report.output.len(), path.display());
    }

    if cli.verbose {
        eprintln!("{}", generate_report(&report));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "barcode-collapse",
            "-d",
            "2",
            "-c",
            "spheres",
            "-r",
            "5",
            "--tie-break",
            "most-neighbors",
            "--print-clusters",
        ])
        .unwrap();
        let config = cli.cluster_config().unwrap();
        assert_eq!(config.tau, Some(2));
        assert_eq!(config.algorithm, ClusterAlgorithm::Spheres);
        assert_eq!(config.tie_break, TieBreak::MostNeighbors);
        assert!(cli.write_options().print_clusters);
    }

    #[test]
    fn test_negative_distance_reaches_validation() {
        let cli = Cli::try_parse_from(["barcode-collapse", "-d", "-1"]).unwrap();
        let config = cli.cluster_config().unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        assert!(Cli::try_parse_from(["barcode-collapse", "-c", "kmeans"]).is_err());
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"tau": 3, "algorithm": "components", "max_rounds": 7}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from(["barcode-collapse", "--config", &path, "-d", "1"]).unwrap();
        let config = cli.cluster_config().unwrap();
        assert_eq!(config.tau, Some(1));
        assert_eq!(config.algorithm, ClusterAlgorithm::Components);
        assert_eq!(config.max_rounds, 7);
    }

    #[test]
    fn test_non_redundant_rejects_member_columns() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("clusters.tsv");
        let cli = Cli::try_parse_from([
            "barcode-collapse",
            "-i",
            "does/not/exist.txt",
            "-o",
            output.to_str().unwrap(),
            "--non-redundant",
            "--print-clusters",
        ])
        .unwrap();
        assert!(cli.write_options().validate().is_err());

        // Rejected before the missing input is opened.
        let err = run_cli(cli).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid output options"));
        assert!(!output.exists());
    }

    #[test]
    fn test_run_non_redundant() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("barcodes.txt");
        let output = dir.path().join("canonicals.txt");
        fs::write(&input, "AAAA\t5\nAAAT\t1\nGGGG\t2\n").unwrap();

        let cli = Cli::try_parse_from([
            "barcode-collapse",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-d",
            "1",
            "--non-redundant",
        ])
        .unwrap();
        run_cli(cli).unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), "AAAA\nGGGG\n");
        dir.close().unwrap();
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("barcodes.txt");
        let output = dir.path().join("clusters.tsv");
        fs::write(&input, "AAAA\t5\nAAAT\t1\nGGGG\t2\n").unwrap();

        let cli = Cli::try_parse_from([
            "barcode-collapse",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-d",
            "1",
            "--seq-id",
        ])
        .unwrap();
        run_cli(cli).unwrap();

        let content = fs::read_to_string(&output).unwrap();
        assert_eq!(content, "AAAA\t6\t1,2\nGGGG\t2\t3\n");

        dir.close().unwrap();
    }
}
