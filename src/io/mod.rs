//! Input/Output operations module.
//!
//! Reading sequences lives in [`fastx`]. This module writes the aggregated
//! clusters, either as a tab-separated table or as JSON.

pub mod fastx;

pub use fastx::{parse_sequences, read_sequences, InputFormat};

use crate::aggregate::ClusterOutput;
use crate::error::{ClusterError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `canonical<TAB>count[<TAB>members][<TAB>ids]`
    #[default]
    Tsv,
    /// The full cluster list as a JSON document.
    Json,
}

/// What to write for each cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub format: OutputFormat,
    /// Add a column with the comma-separated member sequences.
    pub print_clusters: bool,
    /// Add a column with the comma-separated 1-based input ids.
    pub seq_id: bool,
    /// Write only the canonical sequences.
    pub non_redundant: bool,
}

impl WriteOptions {
    pub fn validate(&self) -> Result<()> {
        if self.non_redundant && (self.print_clusters || self.seq_id) {
            return Err(ClusterError::InvalidParameter(
                "non-redundant output cannot list members or ids".to_string(),
            ));
        }
        Ok(())
    }
}

/// Writes `output` to `writer` in the requested format.
pub fn write_clusters<W: Write>(output: &ClusterOutput, writer: W, options: &WriteOptions) -> Result<()> {
    options.validate()?;
    match options.format {
        OutputFormat::Tsv => write_tsv(output, writer, options),
        OutputFormat::Json if options.non_redundant => {
            let canonicals: Vec<&str> = output.clusters.iter().map(|c| c.canonical.as_str()).collect();
            write_json(&canonicals, writer)
        }
        OutputFormat::Json => write_json(output, writer),
    }
}

/// Writes `output` to `path`, or to stdout when `path` is `None`.
pub fn write_clusters_to(output: &ClusterOutput, path: Option<&Path>, options: &WriteOptions) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            write_clusters(output, BufWriter::new(file), options)
        }
        None => write_clusters(output, io::stdout().lock(), options),
    }
}

fn write_tsv<W: Write>(output: &ClusterOutput, writer: W, options: &WriteOptions) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);

    for cluster in &output.clusters {
        if options.non_redundant {
            writer.write_record([&cluster.canonical])?;
            continue;
        }
        let mut record = vec![cluster.canonical.clone(), cluster.count.to_string()];
        if options.print_clusters {
            record.push(cluster.members.iter().join(","));
        }
        if options.seq_id {
            record.push(cluster.ids.iter().map(|id| id + 1).join(","));
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_json<W: Write, T: Serialize + ?Sized>(value: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
