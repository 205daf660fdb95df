// src/edgar/models.rs
#![allow(non_snake_case)]
use serde::{Deserialize, Serialize};

/// Structure representing the EDGAR company submission index
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
///
/// Only the fields needed to locate 10-K primary documents are kept.
#[derive(Debug, Deserialize, Serialize)]
pub struct CompanySubmission {
    pub cik: String,
    #[serde(default)]
    pub name: String,
    pub filings: Filings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Filings {
    pub recent: FilingsList,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FilingsList {
    pub accessionNumber: Vec<String>,
    pub filingDate: Vec<String>,
    pub form: Vec<String>,
    pub primaryDocument: Vec<String>,
}

/// Simple struct representing a specific filing we want to process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilingInfo {
    pub accession_number: String,
    pub filing_date: String,
    pub form_type: String,
    pub ticker: String,
    pub company_name: String,
    pub cik: String,
    pub primary_doc: String,
}

impl CompanySubmission {
    /// Lists the 10-K filings in the recent-filings index.
    pub fn ten_k_filings(&self, ticker: &str) -> Vec<FilingInfo> {
        let recent = &self.filings.recent;
        recent
            .form
            .iter()
            .enumerate()
            .filter(|(_, form)| form.as_str() == "10-K")
            .filter_map(|(i, form)| {
                Some(FilingInfo {
                    accession_number: recent.accessionNumber.get(i)?.clone(),
                    filing_date: recent.filingDate.get(i).cloned().unwrap_or_default(),
                    form_type: form.clone(),
                    ticker: ticker.to_uppercase(),
                    company_name: self.name.clone(),
                    cik: self.cik.clone(),
                    primary_doc: recent.primaryDocument.get(i)?.clone(),
                })
            })
            .collect()
    }
}

impl FilingInfo {
    /// Constructs the URL to access the primary document of this filing
    pub fn primary_doc_url(&self) -> String {
        let acc_no_dashes = self.accession_number.replace('-', "");
        let cik = self.cik.trim_start_matches('0');
        format!(
            "https://www.sec.gov/Archives/edgar/data/{}/{}/{}",
            cik, acc_no_dashes, self.primary_doc
        )
    }
}

/// EDGAR expects ten-digit zero-padded CIKs in submission URLs.
pub fn pad_cik(cik: &str) -> String {
    format!("{:0>10}", cik.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMISSION_JSON: &str = r#"{
        "cik": "320193",
        "name": "Apple Inc.",
        "tickers": ["AAPL"],
        "filings": {
            "recent": {
                "accessionNumber": [
                    "0000320193-23-000106",
                    "0000320193-23-000077",
                    "0000320193-22-000108"
                ],
                "filingDate": ["2023-11-03", "2023-08-04", "2022-10-28"],
                "form": ["10-K", "10-Q", "10-K"],
                "primaryDocument": ["aapl-20230930.htm", "aapl-20230701.htm", "aapl-20220924.htm"]
            }
        }
    }"#;

    #[test]
    fn selects_only_ten_k_filings() {
        let submission: CompanySubmission = serde_json::from_str(SUBMISSION_JSON).unwrap();
        let filings = submission.ten_k_filings("aapl");
        assert_eq!(filings.len(), 2);
        assert_eq!(filings[0].accession_number, "0000320193-23-000106");
        assert_eq!(filings[1].primary_doc, "aapl-20220924.htm");
        assert_eq!(filings[0].ticker, "AAPL");
    }

    #[test]
    fn primary_doc_url_strips_dashes_and_padding() {
        let filing = FilingInfo {
            accession_number: "0000320193-23-000106".to_string(),
            filing_date: "2023-11-03".to_string(),
            form_type: "10-K".to_string(),
            ticker: "AAPL".to_string(),
            company_name: "Apple Inc.".to_string(),
            cik: "0000320193".to_string(),
            primary_doc: "aapl-20230930.htm".to_string(),
        };
        assert_eq!(
            filing.primary_doc_url(),
            "https://www.sec.gov/Archives/edgar/data/320193/000032019323000106/aapl-20230930.htm"
        );
    }

    #[test]
    fn pads_cik_to_ten_digits() {
        assert_eq!(pad_cik("320193"), "0000320193");
        assert_eq!(pad_cik("0000320193"), "0000320193");
    }
}
