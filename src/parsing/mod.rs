//! Line-oriented readers for the solver's inputs.
//!
//! | Input            | Columns                                            | Module       |
//! |------------------|----------------------------------------------------|--------------|
//! | variant catalog  | `build position ancestral derived [names]`         | [`variants`] |
//! | reference swaps  | `build position ancestral derived`                 | [`variants`] |
//! | coverage table   | `kit min max`                                      | [`coverage`] |
//! | per-kit BED      | `chrom start end` (kit id from the file stem)      | [`coverage`] |
//! | calls table      | `kit build position ref alt genotype`              | [`calls`]    |
//! | VCF              | single sample; kit id from the sample column       | [`vcf`]      |
//! | roster           | one kit id per line                                | [`roster`]   |
//!
//! Blank lines and `#` comments are skipped, as is a leading header line.
//! Names in the `names` column are comma separated. Files ending in `.gz` or
//! `.bgz` are decompressed on the fly, including multi-member (bgzip) streams.
//! VCF records are read with noodles; the line parser in [`vcf`] is kept as a
//! fallback for files whose header noodles rejects.
//!
//! Malformed records do not abort a load: they are logged, skipped and counted
//! in [`LoadStats`]. Only I/O failures and structural problems (such as a VCF
//! without a sample column) are errors.

use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

pub mod calls;
pub mod coverage;
pub mod roster;
pub mod variants;
pub mod vcf;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Too many records: {0} exceeds maximum allowed")]
    TooManyRecords(usize),
}

/// Record counts from one or more loads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub records: usize,
    pub malformed: usize,
}

impl LoadStats {
    pub fn merge(&mut self, other: LoadStats) {
        self.records += other.records;
        self.malformed += other.malformed;
    }

    fn accept(&mut self) -> Result<(), ParseError> {
        if crate::utils::validation::check_record_limit(self.records).is_some() {
            return Err(ParseError::TooManyRecords(self.records));
        }
        self.records += 1;
        Ok(())
    }

    fn reject(&mut self, source: &str, line_num: usize, reason: &str) {
        tracing::warn!("{}:{}: skipping malformed record ({})", source, line_num, reason);
        self.malformed += 1;
    }
}

/// Open a text input, decompressing `.gz` and `.bgz` files
///
/// Every gzip member is read, so block-gzipped files are not truncated after
/// their first block.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be opened.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>, ParseError> {
    let file = File::open(path)?;
    let is_gz = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gz") || e.eq_ignore_ascii_case("bgz"));
    if is_gz {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Data lines of a tabular input as (1-based line number, fields)
///
/// Skips blanks, `#` comments and a first line whose leading field equals
/// `header` (case-insensitive).
pub(crate) fn data_lines<R: BufRead>(
    reader: R,
    header: &'static str,
) -> impl Iterator<Item = Result<(usize, Vec<String>), ParseError>> {
    let mut first_data_line = true;
    reader.lines().enumerate().filter_map(move |(i, line)| {
        let line = match line {
            Ok(line) => line,
            Err(e) => return Some(Err(ParseError::Io(e))),
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let fields: Vec<String> = line.split('\t').map(|f| f.trim().to_string()).collect();
        if first_data_line {
            first_data_line = false;
            if fields.first().is_some_and(|f| f.eq_ignore_ascii_case(header)) {
                return None;
            }
        }
        Some(Ok((i + 1, fields)))
    })
}

/// Human-readable name of an input for log messages
pub(crate) fn source_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
