use std::io::BufRead;
use std::path::Path;

use crate::core::call::{CallState, RawCall};
use crate::core::types::KitId;
use crate::core::variant::VariantCatalog;
use crate::parsing::variants::parse_variant_fields;
use crate::parsing::{data_lines, open_text, source_name, LoadStats, ParseError};
use crate::utils::validation::is_valid_kit_id;

/// Load a calls table, adding unseen variants to `catalog`
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read.
pub fn load_calls(path: &Path, catalog: &mut VariantCatalog) -> Result<(Vec<RawCall>, LoadStats), ParseError> {
    parse_calls(open_text(path)?, &source_name(path), catalog)
}

/// Parse `kit build position ref alt genotype` records.
///
/// `ref`/`alt` are matched against the catalog as ancestral/derived, so a call
/// on a reference-swapped site lands on the companion variant.
///
/// # Errors
///
/// Returns `ParseError::Io` on read failures or `ParseError::TooManyRecords`.
pub fn parse_calls<R: BufRead>(
    reader: R,
    source: &str,
    catalog: &mut VariantCatalog,
) -> Result<(Vec<RawCall>, LoadStats), ParseError> {
    let mut stats = LoadStats::default();
    let mut calls = Vec::new();

    for line in data_lines(reader, "kit") {
        let (line_num, fields) = line?;
        if fields.len() < 6 {
            stats.reject(source, line_num, "expected kit, build, position, ref, alt and genotype");
            continue;
        }
        if !is_valid_kit_id(&fields[0]) {
            stats.reject(source, line_num, "invalid kit id");
            continue;
        }
        let variant = match parse_variant_fields(&fields[1..5]) {
            Ok(variant) => variant,
            Err(reason) => {
                stats.reject(source, line_num, &reason);
                continue;
            }
        };
        let Some(state) = CallState::from_genotype(&fields[5]) else {
            stats.reject(source, line_num, "invalid genotype");
            continue;
        };

        stats.accept()?;
        let id = catalog.get_or_insert(variant);
        calls.push(RawCall::new(KitId::new(fields[0].as_str()), id, state));
    }

    Ok((calls, stats))
}
