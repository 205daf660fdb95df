// src/edgar/filing.rs
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::extractors::{ExtractedSection, FrequencyMap};
use crate::utils::error::ExtractError;

/// Two-digit years above this belong to the 1900s.
const CENTURY_CUTOFF: u32 = 50;

/// The (CIK, year, accession) triple encoded in a staged filing's directory name,
/// e.g. `0000320193-20-000096`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingIdentifier {
    pub cik: String,
    pub year: i32,
    pub accession_number: String,
}

/// One row per filing; the shape sent to the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub ticker: String,
    pub cik: String,
    pub year: i32,
    pub accession_number: String,
    pub section_label: String,
    pub section_text: String,
    #[serde(rename = "word_frequency")]
    pub frequency_map: FrequencyMap,
}

/// Expands a two-digit filing year: above 50 is 19xx, anything else 20xx.
pub fn expand_year(two_digit: &str) -> Option<i32> {
    let century = match two_digit.parse::<u32>() {
        Ok(yy) if yy > CENTURY_CUTOFF => "19",
        _ => "20",
    };
    format!("{}{}", century, two_digit).parse().ok()
}

/// Reads the identifier from the document's parent directory name.
pub fn parse_identifier(document_path: &Path) -> Result<FilingIdentifier, ExtractError> {
    let malformed = || ExtractError::MalformedPath(document_path.display().to_string());

    let segment = document_path
        .parent()
        .and_then(|dir| dir.file_name())
        .and_then(|name| name.to_str())
        .ok_or_else(malformed)?;

    let parts: Vec<&str> = segment.split('-').collect();
    let [cik, two_digit_year, accession] = parts.as_slice() else {
        return Err(malformed());
    };
    if cik.is_empty() || two_digit_year.is_empty() || accession.is_empty() {
        return Err(malformed());
    }

    let year = expand_year(two_digit_year).ok_or_else(|| ExtractError::InvalidYear {
        year: two_digit_year.to_string(),
        path: document_path.display().to_string(),
    })?;

    Ok(FilingIdentifier {
        cik: cik.to_string(),
        year,
        accession_number: accession.to_string(),
    })
}

/// Builds the record for one document from its already parsed identifier.
pub fn build(
    id: FilingIdentifier,
    ticker: &str,
    section: &ExtractedSection,
    frequency_map: FrequencyMap,
) -> FilingRecord {
    FilingRecord {
        ticker: ticker.to_string(),
        cik: id.cik,
        year: id.year,
        accession_number: id.accession_number,
        section_label: section.label.clone(),
        section_text: section.text_or_sentinel().to_string(),
        frequency_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc(dir: &str) -> PathBuf {
        PathBuf::from("data/sec-edgar-filings/AAPL/10-K")
            .join(dir)
            .join("primary-document.html")
    }

    #[test]
    fn year_expansion_uses_fifty_cutoff() {
        assert_eq!(expand_year("05"), Some(2005));
        assert_eq!(expand_year("99"), Some(1999));
        assert_eq!(expand_year("50"), Some(2050));
        assert_eq!(expand_year("51"), Some(1951));
        assert_eq!(expand_year("x1"), None);
    }

    #[test]
    fn parses_identifier_from_accession_directory() {
        let id = parse_identifier(&doc("0000320193-20-000096")).unwrap();
        assert_eq!(id.cik, "0000320193");
        assert_eq!(id.year, 2020);
        assert_eq!(id.accession_number, "000096");
    }

    #[test]
    fn malformed_directories_are_skipped() {
        for dir in ["0000320193-20", "0000320193--000096", "a-b-c-d", "plain"] {
            let result = parse_identifier(&doc(dir));
            assert!(
                matches!(result, Err(ExtractError::MalformedPath(_))),
                "{} should be malformed",
                dir
            );
        }
    }

    #[test]
    fn non_numeric_year_is_skipped() {
        let result = parse_identifier(&doc("0000320193-2x-000096"));
        assert!(matches!(result, Err(ExtractError::InvalidYear { .. })));
    }

    #[test]
    fn builds_record_with_sentinel_for_missing_section() {
        let section = ExtractedSection {
            label: "MD&A".to_string(),
            text: None,
        };
        let id = parse_identifier(&doc("0000320193-99-000001")).unwrap();
        let record = build(id, "AAPL", &section, FrequencyMap::new());
        assert_eq!(record.ticker, "AAPL");
        assert_eq!(record.year, 1999);
        assert_eq!(record.accession_number, "000001");
        assert_eq!(record.section_text, "Section not found");
        assert!(record.frequency_map.is_empty());
    }
}
