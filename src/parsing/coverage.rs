use std::io::BufRead;
use std::path::Path;

use crate::core::types::KitId;
use crate::coverage::{CoverageIndex, CoverageRange};
use crate::parsing::{data_lines, open_text, source_name, LoadStats, ParseError};
use crate::utils::validation::{is_same_chromosome, is_valid_kit_id};

/// Whether the path names a BED file (optionally gzipped)
#[must_use]
pub fn is_bed_file(path: &Path) -> bool {
    let name = path.to_string_lossy().to_lowercase();
    name.ends_with(".bed") || name.ends_with(".bed.gz")
}

/// Kit id of a per-kit BED file: the file name without `.bed`/`.bed.gz`
#[must_use]
pub fn kit_from_bed_path(path: &Path) -> Option<KitId> {
    let name = path.file_name()?.to_string_lossy();
    let lower = name.to_lowercase();
    let stem_len = if lower.ends_with(".bed.gz") {
        name.len() - ".bed.gz".len()
    } else if lower.ends_with(".bed") {
        name.len() - ".bed".len()
    } else {
        return None;
    };
    let stem = &name[..stem_len];
    is_valid_kit_id(stem).then(|| KitId::new(stem))
}

/// Load coverage: a per-kit BED file or a `kit min max` table.
///
/// BED rows on chromosomes other than `chrom` are skipped. The index is left unsorted; call [`CoverageIndex::finalize`] once all
/// inputs are in.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or
/// `ParseError::InvalidFormat` if a BED file name yields no kit id.
pub fn load_coverage(path: &Path, chrom: &str, index: &mut CoverageIndex) -> Result<LoadStats, ParseError> {
    let source = source_name(path);
    if is_bed_file(path) {
        let kit = kit_from_bed_path(path).ok_or_else(|| {
            ParseError::InvalidFormat(format!("Cannot derive a kit id from BED file name '{source}'"))
        })?;
        parse_bed(open_text(path)?, &source, &kit, chrom, index)
    } else {
        parse_coverage_table(open_text(path)?, &source, index)
    }
}

/// Parse `kit min max` records (BED-style half-open ranges)
///
/// # Errors
///
/// Returns `ParseError::Io` on read failures or `ParseError::TooManyRecords`.
pub fn parse_coverage_table<R: BufRead>(
    reader: R,
    source: &str,
    index: &mut CoverageIndex,
) -> Result<LoadStats, ParseError> {
    let mut stats = LoadStats::default();

    for line in data_lines(reader, "kit") {
        let (line_num, fields) = line?;
        if fields.len() < 3 {
            stats.reject(source, line_num, "expected kit, min and max");
            continue;
        }
        if !is_valid_kit_id(&fields[0]) {
            stats.reject(source, line_num, "invalid kit id");
            continue;
        }
        let Some(range) = parse_range(&fields[1], &fields[2]) else {
            stats.reject(source, line_num, "invalid range bounds");
            continue;
        };

        stats.accept()?;
        index.insert(KitId::new(fields[0].as_str()), range);
    }

    Ok(stats)
}

/// Parse a BED file (`chrom start end ...`) holding one kit's coverage
///
/// Only rows whose chrom column names `chrom` (or one of its aliases) are
/// kept; rows on other chromosomes are not counted as malformed.
///
/// # Errors
///
/// Returns `ParseError::Io` on read failures or `ParseError::TooManyRecords`.
pub fn parse_bed<R: BufRead>(
    reader: R,
    source: &str,
    kit: &KitId,
    chrom: &str,
    index: &mut CoverageIndex,
) -> Result<LoadStats, ParseError> {
    let mut stats = LoadStats::default();
    let mut other_chrom = 0_usize;

    for line in data_lines(reader, "track") {
        let (line_num, fields) = line?;
        if fields[0].starts_with("track") || fields[0].starts_with("browser") {
            continue;
        }
        if fields.len() < 3 {
            stats.reject(source, line_num, "expected chrom, start and end");
            continue;
        }
        if !is_same_chromosome(&fields[0], chrom) {
            other_chrom += 1;
            continue;
        }
        let Some(range) = parse_range(&fields[1], &fields[2]) else {
            stats.reject(source, line_num, "invalid range bounds");
            continue;
        };

        stats.accept()?;
        index.insert(kit.clone(), range);
    }

    if other_chrom > 0 {
        tracing::debug!("{}: skipped {} rows not on {}", source, other_chrom, chrom);
    }

    // a kit with a BED file but no ranges still counts as known
    if stats.records == 0 {
        index.ensure_kit(kit.clone());
    }

    Ok(stats)
}

fn parse_range(min: &str, max: &str) -> Option<CoverageRange> {
    let min: u64 = min.parse().ok()?;
    let max: u64 = max.parse().ok()?;
    (min < max).then(|| CoverageRange::new(min, max))
}
