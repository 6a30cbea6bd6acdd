//! Input readers.
//!
//! Three input formats are accepted and told apart from the content:
//!
//! - FASTA or FASTQ, possibly gzip/bzip2/zstd compressed, parsed with
//!   `needletail`. Every record counts once.
//! - Raw: one sequence per line, optionally followed by a TAB and a positive
//!   count. Blank lines are skipped.

use crate::bio::SequenceSet;
use crate::error::{ClusterError, Result};
use log::info;
use needletail::parse_fastx_reader;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Raw,
    /// FASTA, FASTQ or a compressed stream of either.
    Fastx,
}

impl InputFormat {
    /// Guesses the format from the first bytes of the input.
    pub fn detect(data: &[u8]) -> InputFormat {
        if [GZIP_MAGIC, BZIP2_MAGIC, ZSTD_MAGIC]
            .iter()
            .any(|magic| data.starts_with(magic))
        {
            return InputFormat::Fastx;
        }
        match data.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'>') | Some(b'@') => InputFormat::Fastx,
            _ => InputFormat::Raw,
        }
    }
}

/// Reads sequences from `path`, or from stdin when `path` is `None`.
pub fn read_sequences(path: Option<&Path>) -> Result<SequenceSet> {
    let mut data = Vec::new();
    match path {
        Some(path) => {
            info!("Reading sequences from {}", path.display());
            BufReader::new(File::open(path)?).read_to_end(&mut data)?;
        }
        None => {
            info!("Reading sequences from stdin");
            io::stdin().lock().read_to_end(&mut data)?;
        }
    }
    let sequences = parse_sequences(&data)?;
    info!(
        "Read {} records ({} unique sequences)",
        sequences.n_records(),
        sequences.len()
    );
    Ok(sequences)
}

/// Parses an in-memory input of any supported format.
pub fn parse_sequences(data: &[u8]) -> Result<SequenceSet> {
    match InputFormat::detect(data) {
        InputFormat::Fastx => parse_fastx(data),
        InputFormat::Raw => {
            let text = std::str::from_utf8(data).map_err(|e| ClusterError::Parse {
                line: line_of_offset(data, e.valid_up_to()),
                message: "input is not valid UTF-8".to_string(),
            })?;
            parse_raw(text)
        }
    }
}

/// Parses FASTA/FASTQ records; each record counts once.
pub fn parse_fastx(data: &[u8]) -> Result<SequenceSet> {
    let mut reader = parse_fastx_reader(Cursor::new(data))?;
    let mut reads: Vec<String> = Vec::new();
    while let Some(record) = reader.next() {
        let record = record?;
        reads.push(String::from_utf8_lossy(&record.seq()).into_owned());
    }
    SequenceSet::from_reads(reads)
}

/// Parses the raw `SEQ[\tCOUNT]` line format.
pub fn parse_raw(text: &str) -> Result<SequenceSet> {
    let mut records: Vec<(&str, u64)> = Vec::new();
    for (line_index, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.splitn(2, '\t');
        let seq = fields.next().unwrap_or_default().trim();
        let count = match fields.next() {
            None => 1,
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ClusterError::Parse {
                line: line_index + 1,
                message: format!("invalid count '{}': {}", raw.trim(), e),
            })?,
        };
        records.push((seq, count));
    }
    SequenceSet::from_counts(records)
}

fn line_of_offset(data: &[u8], offset: usize) -> usize {
    data[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}
