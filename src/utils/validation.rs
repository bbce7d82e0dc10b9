//! Centralized validation helpers for input records.

/// Maximum number of records accepted from a single input (DOS protection)
pub const MAX_RECORDS: usize = 10_000_000;

/// Maximum length of a kit identifier
pub const MAX_KIT_ID_LENGTH: usize = 255;

/// Validate and upper-case an allele (`A`, `C`, `G`, `T`, `N`; indels allowed).
///
/// # Examples
///
/// ```
/// use clade_solver::utils::validation::normalize_allele;
///
/// assert_eq!(normalize_allele("acgt"), Some("ACGT".to_string()));
/// assert_eq!(normalize_allele("<DEL>"), None);
/// assert_eq!(normalize_allele(""), None);
/// ```
#[must_use]
pub fn normalize_allele(s: &str) -> Option<String> {
    let s = s.trim();
    if !s.is_empty() && s.chars().all(|c| matches!(c.to_ascii_uppercase(), 'A' | 'C' | 'G' | 'T' | 'N')) {
        Some(s.to_ascii_uppercase())
    } else {
        None
    }
}

/// Check that a kit identifier is usable: non-empty, bounded, no whitespace
#[must_use]
pub fn is_valid_kit_id(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_KIT_ID_LENGTH && !s.chars().any(char::is_whitespace)
}

/// Check if the record count exceeds the limit.
/// Returns `Some(error_message)` if exceeded, `None` if within limits.
#[must_use]
pub fn check_record_limit(count: usize) -> Option<String> {
    if count >= MAX_RECORDS {
        Some(format!(
            "Too many records: {count} exceeds maximum of {MAX_RECORDS}"
        ))
    } else {
        None
    }
}

/// Whether a contig name refers to the chromosome `wanted`
///
/// Names are compared case-insensitively with any `chr` prefix removed. For the
/// Y chromosome the numeric (`24`) and RefSeq/GenBank accession names also match.
///
/// # Examples
///
/// ```
/// use clade_solver::utils::validation::is_same_chromosome;
///
/// assert!(is_same_chromosome("Y", "chrY"));
/// assert!(is_same_chromosome("NC_000024.10", "chrY"));
/// assert!(!is_same_chromosome("chrX", "chrY"));
/// ```
#[must_use]
pub fn is_same_chromosome(name: &str, wanted: &str) -> bool {
    let name = chromosome_key(name);
    let wanted = chromosome_key(wanted);
    if name == wanted {
        return true;
    }
    wanted == "y" && (name == "24" || name.starts_with("nc_000024.") || name.starts_with("cm000686."))
}

fn chromosome_key(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_prefix("chr") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => lower,
    }
}
