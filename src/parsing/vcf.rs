//! Reader for single-sample VCF call files.
//!
//! Files are read with noodles: the header's first sample names the kit, and
//! each record on the selected chromosome yields one call per ALT allele,
//! taken from the sample's `GT` field. Records without an ALT allele (`.`) and
//! symbolic alleles (`<DEL>`, `*`) are skipped.
//!
//! When noodles rejects the header (for example a file without a
//! `##fileformat` line), the file is re-read with [`parse_vcf`], a line parser
//! that only interprets the `#CHROM` line.

use std::io::BufRead;
use std::path::Path;

use noodles::vcf;
use noodles::vcf::variant::record::{AlternateBases, Ids};

use crate::core::call::{CallState, RawCall};
use crate::core::types::KitId;
use crate::core::variant::{Variant, VariantCatalog};
use crate::parsing::{open_text, source_name, LoadStats, ParseError};
use crate::utils::validation::{is_same_chromosome, is_valid_kit_id, normalize_allele};

/// Load a VCF (optionally gzipped) whose positions are on `build`
///
/// Only records on `chrom` (or one of its aliases) are read.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or
/// `ParseError::InvalidFormat` if no usable sample column is found.
pub fn load_vcf(
    path: &Path,
    build: &str,
    chrom: &str,
    catalog: &mut VariantCatalog,
) -> Result<(Vec<RawCall>, LoadStats), ParseError> {
    let source = source_name(path);
    match read_vcf(open_text(path)?, &source, build, chrom, catalog) {
        Err(ParseError::Noodles(e)) => {
            tracing::warn!("{}: {}; falling back to the line parser", source, e);
            parse_vcf(open_text(path)?, &source, build, chrom, catalog)
        }
        result => result,
    }
}

/// Whether the path names a VCF file (optionally gzipped)
#[must_use]
pub fn is_vcf_file(path: &Path) -> bool {
    let name = path.to_string_lossy().to_lowercase();
    name.ends_with(".vcf") || name.ends_with(".vcf.gz") || name.ends_with(".vcf.bgz")
}

/// Read VCF text with noodles into calls for its first sample
///
/// # Errors
///
/// Returns `ParseError::Noodles` if the header cannot be parsed (no variants
/// have been added to `catalog` at that point), `ParseError::InvalidFormat` if
/// the header names no usable sample, or `ParseError::Io` on read failures.
pub fn read_vcf<R: BufRead>(
    reader: R,
    source: &str,
    build: &str,
    chrom: &str,
    catalog: &mut VariantCatalog,
) -> Result<(Vec<RawCall>, LoadStats), ParseError> {
    let mut reader = vcf::io::Reader::new(reader);
    let header = reader
        .read_header()
        .map_err(|e| ParseError::Noodles(format!("{source}: {e}")))?;

    let sample = header.sample_names().iter().next().map(String::as_str).unwrap_or_default();
    let kit = parse_kit(sample)?;

    let mut stats = LoadStats::default();
    let mut calls = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record_num = i + 1;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                stats.reject(source, record_num, "unreadable record");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if !is_same_chromosome(record.reference_sequence_name(), chrom) {
            continue;
        }
        let Some(Ok(position)) = record.variant_start() else {
            stats.reject(source, record_num, "invalid position");
            continue;
        };
        let Some(reference) = normalize_allele(record.reference_bases()) else {
            stats.reject(source, record_num, "invalid REF allele");
            continue;
        };
        let alternates = record.alternate_bases();
        if alternates.is_empty() {
            continue;
        }
        let samples = record.samples();
        let Some((format, values)) = samples.as_ref().split_once('\t') else {
            stats.reject(source, record_num, "no sample column");
            continue;
        };
        let Some(genotype) = genotype_field(format, values.split('\t').next().unwrap_or_default()) else {
            stats.reject(source, record_num, "no GT field");
            continue;
        };

        let name = record.ids().iter().next().map(str::to_string);
        for (index, alt) in (1_u32..).zip(alternates.iter()) {
            let Some(alt) = alt.ok().and_then(normalize_allele) else {
                continue;
            };
            let Some(state) = CallState::for_allele(genotype, index) else {
                stats.reject(source, record_num, "invalid genotype");
                break;
            };

            stats.accept()?;
            let mut variant = Variant::new(build, position.get() as u64, reference.clone(), alt);
            if let Some(name) = &name {
                variant = variant.with_name(name);
            }
            let id = catalog.get_or_insert(variant);
            calls.push(RawCall::new(kit.clone(), id, state));
        }
    }

    Ok((calls, stats))
}

/// Parse VCF text line by line into calls for its single sample
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if data precedes the `#CHROM` line or
/// that line has no sample column.
pub fn parse_vcf<R: BufRead>(
    reader: R,
    source: &str,
    build: &str,
    chrom: &str,
    catalog: &mut VariantCatalog,
) -> Result<(Vec<RawCall>, LoadStats), ParseError> {
    let mut stats = LoadStats::default();
    let mut calls = Vec::new();
    let mut kit: Option<KitId> = None;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line_num = i + 1;

        if line.starts_with("##") || line.trim().is_empty() {
            continue;
        }
        if line.starts_with("#CHROM") {
            kit = Some(sample_kit(&line)?);
            continue;
        }
        let Some(kit) = kit.as_ref() else {
            return Err(ParseError::InvalidFormat(format!(
                "{source}: data line {line_num} precedes the #CHROM header"
            )));
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 10 {
            stats.reject(source, line_num, "expected at least 10 columns");
            continue;
        }
        if !is_same_chromosome(fields[0], chrom) {
            continue;
        }

        let Some(position) = fields[1].parse::<u64>().ok().filter(|&p| p > 0) else {
            stats.reject(source, line_num, "invalid position");
            continue;
        };
        let Some(reference) = normalize_allele(fields[3]) else {
            stats.reject(source, line_num, "invalid REF allele");
            continue;
        };
        if fields[4] == "." {
            continue;
        }
        let Some(genotype) = genotype_field(fields[8], fields[9]) else {
            stats.reject(source, line_num, "no GT field");
            continue;
        };

        let name = (fields[2] != ".").then(|| fields[2].split(';').next().unwrap_or_default());
        for (index, alt) in (1_u32..).zip(fields[4].split(',')) {
            let Some(alt) = normalize_allele(alt) else {
                continue;
            };
            let Some(state) = CallState::for_allele(genotype, index) else {
                stats.reject(source, line_num, "invalid genotype");
                break;
            };

            stats.accept()?;
            let mut variant = Variant::new(build, position, reference.clone(), alt);
            if let Some(name) = name {
                variant = variant.with_name(name);
            }
            let id = catalog.get_or_insert(variant);
            calls.push(RawCall::new(kit.clone(), id, state));
        }
    }

    if kit.is_none() {
        return Err(ParseError::InvalidFormat(format!("{source}: no #CHROM header line")));
    }

    Ok((calls, stats))
}

fn sample_kit(header: &str) -> Result<KitId, ParseError> {
    parse_kit(header.split('\t').nth(9).map(str::trim).unwrap_or_default())
}

fn parse_kit(sample: &str) -> Result<KitId, ParseError> {
    if is_valid_kit_id(sample) {
        Ok(KitId::new(sample))
    } else {
        Err(ParseError::InvalidFormat(format!(
            "VCF header has no usable sample column: '{sample}'"
        )))
    }
}

/// The sample's GT value given the FORMAT and sample columns
fn genotype_field<'a>(format: &str, sample: &'a str) -> Option<&'a str> {
    let index = format.split(':').position(|key| key == "GT")?;
    sample.split(':').nth(index)
}
