use std::io::BufRead;
use std::path::Path;

use crate::core::call::KitRoster;
use crate::core::types::KitId;
use crate::parsing::{data_lines, open_text, source_name, LoadStats, ParseError};
use crate::utils::validation::is_valid_kit_id;

/// Load a kit roster: one kit id per line, first column only
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read.
pub fn load_roster(path: &Path) -> Result<(KitRoster, LoadStats), ParseError> {
    parse_roster(open_text(path)?, &source_name(path))
}

/// Parse a roster; duplicate kits keep their first position
///
/// # Errors
///
/// Returns `ParseError::Io` on read failures or `ParseError::TooManyRecords`.
pub fn parse_roster<R: BufRead>(reader: R, source: &str) -> Result<(KitRoster, LoadStats), ParseError> {
    let mut stats = LoadStats::default();
    let mut kits = Vec::new();

    for line in data_lines(reader, "kit") {
        let (line_num, fields) = line?;
        if !is_valid_kit_id(&fields[0]) {
            stats.reject(source, line_num, "invalid kit id");
            continue;
        }
        stats.accept()?;
        kits.push(KitId::new(fields[0].as_str()));
    }

    Ok((KitRoster::new(kits), stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roster() {
        let text = "kit\n# selected for run 7\nB2\nA1\tnote\nB2\n\nC3\n";
        let (roster, stats) = parse_roster(text.as_bytes(), "roster").unwrap();

        assert_eq!(stats.records, 4);
        let kits: Vec<&str> = roster.kits().iter().map(KitId::as_str).collect();
        assert_eq!(kits, vec!["B2", "A1", "C3"]);
    }

    #[test]
    fn test_empty_roster() {
        let (roster, stats) = parse_roster("".as_bytes(), "roster").unwrap();
        assert!(roster.is_empty());
        assert_eq!(stats, LoadStats::default());
    }
}
