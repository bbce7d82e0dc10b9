use std::io::BufRead;
use std::path::Path;

use crate::core::variant::{Variant, VariantCatalog};
use crate::parsing::{data_lines, open_text, source_name, LoadStats, ParseError};
use crate::utils::validation::normalize_allele;

/// Load a variant catalog file into `catalog`
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read.
pub fn load_variant_catalog(path: &Path, catalog: &mut VariantCatalog) -> Result<LoadStats, ParseError> {
    parse_variant_catalog(open_text(path)?, &source_name(path), catalog)
}

/// Parse `build position ancestral derived [names]` records
///
/// # Errors
///
/// Returns `ParseError::Io` on read failures or `ParseError::TooManyRecords`.
pub fn parse_variant_catalog<R: BufRead>(
    reader: R,
    source: &str,
    catalog: &mut VariantCatalog,
) -> Result<LoadStats, ParseError> {
    let mut stats = LoadStats::default();

    for line in data_lines(reader, "build") {
        let (line_num, fields) = line?;
        let mut variant = match parse_variant_fields(&fields) {
            Ok(variant) => variant,
            Err(reason) => {
                stats.reject(source, line_num, &reason);
                continue;
            }
        };

        if let Some(names) = fields.get(4) {
            variant.names = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty() && *n != ".")
                .map(str::to_string)
                .collect();
        }

        stats.accept()?;
        catalog.get_or_insert(variant);
    }

    Ok(stats)
}

/// Load a reference-swap file and register each listed site
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read.
pub fn load_reference_swaps(path: &Path, catalog: &mut VariantCatalog) -> Result<LoadStats, ParseError> {
    parse_reference_swaps(open_text(path)?, &source_name(path), catalog)
}

/// Parse canonical `build position ancestral derived` records of reference-swapped sites.
///
/// Sites missing from the catalog are added before their companion is registered.
///
/// # Errors
///
/// Returns `ParseError::Io` on read failures or `ParseError::TooManyRecords`.
pub fn parse_reference_swaps<R: BufRead>(
    reader: R,
    source: &str,
    catalog: &mut VariantCatalog,
) -> Result<LoadStats, ParseError> {
    let mut stats = LoadStats::default();

    for line in data_lines(reader, "build") {
        let (line_num, fields) = line?;
        let variant = match parse_variant_fields(&fields) {
            Ok(variant) => variant,
            Err(reason) => {
                stats.reject(source, line_num, &reason);
                continue;
            }
        };

        if variant.ancestral == variant.derived {
            stats.reject(source, line_num, "alleles are identical");
            continue;
        }

        stats.accept()?;
        let canonical = catalog.get_or_insert(variant);
        catalog.register_reference_swap(canonical);
    }

    Ok(stats)
}

pub(crate) fn parse_variant_fields(fields: &[String]) -> Result<Variant, String> {
    if fields.len() < 4 {
        return Err(format!("expected at least 4 fields, found {}", fields.len()));
    }
    let build = fields[0].as_str();
    if build.is_empty() {
        return Err("empty build".to_string());
    }
    let position: u64 = fields[1]
        .parse()
        .ok()
        .filter(|&p| p > 0)
        .ok_or_else(|| format!("invalid position '{}'", fields[1]))?;
    let ancestral = normalize_allele(&fields[2]).ok_or_else(|| format!("invalid allele '{}'", fields[2]))?;
    let derived = normalize_allele(&fields[3]).ok_or_else(|| format!("invalid allele '{}'", fields[3]))?;
    Ok(Variant::new(build, position, ancestral, derived))
}
