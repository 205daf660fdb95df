// src/storage/status.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::utils::error::StorageError;

/// One row of the resumable status table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerStatus {
    pub ticker: String,
    #[serde(rename = "cik_str")]
    pub cik: String,
    pub title: String,
    #[serde(serialize_with = "write_flag", deserialize_with = "read_flag")]
    pub processed: bool,
}

#[cfg(test)]
impl TickerStatus {
    pub fn new(ticker: &str, cik: &str, title: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            cik: cik.to_string(),
            title: title.to_string(),
            processed: false,
        }
    }
}

// The table is shared with pandas tooling, which writes True/False.
fn write_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "True" } else { "False" })
}

fn read_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid processed flag '{}'", other))),
    }
}

/// The status table backing a run. Only the orchestrator mutates it.
#[derive(Debug, Clone)]
pub struct StatusTable {
    path: PathBuf,
    rows: Vec<TickerStatus>,
}

impl StatusTable {
    pub fn new<P: AsRef<Path>>(path: P, rows: Vec<TickerStatus>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            rows,
        }
    }

    /// Reads the whole table. Duplicate tickers are rejected.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        for row in reader.deserialize() {
            let row: TickerStatus = row?;
            if !seen.insert(row.ticker.clone()) {
                return Err(StorageError::DuplicateTicker(row.ticker));
            }
            rows.push(row);
        }
        tracing::info!("Loaded {} tickers from {}", rows.len(), path.display());
        Ok(Self::new(path, rows))
    }

    /// Rewrites the table in place via a temporary file.
    pub fn save(&self) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!("Saved status table to {}", self.path.display());
        Ok(())
    }

    /// Unprocessed rows, in table order.
    pub fn pending(&self) -> Vec<TickerStatus> {
        self.rows.iter().filter(|r| !r.processed).cloned().collect()
    }

    /// Returns false when the ticker is unknown.
    pub fn mark_processed(&mut self, ticker: &str) -> bool {
        match self.rows.iter_mut().find(|r| r.ticker == ticker) {
            Some(row) => {
                row.processed = true;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_processed(&self, ticker: &str) -> Option<bool> {
        self.rows.iter().find(|r| r.ticker == ticker).map(|r| r.processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "ticker,cik_str,title,processed\n\
        AAPL,320193,Apple Inc.,False\n\
        MSFT,789019,MICROSOFT CORP,True\n\
        NVDA,1045810,NVIDIA CORP,false\n";

    fn write_table(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processing_status.csv");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_pending_rows_in_order() {
        let (_dir, path) = write_table(TABLE);
        let table = StatusTable::load(&path).unwrap();
        assert_eq!(table.is_processed("MSFT"), Some(true));
        let pending: Vec<_> = table.pending().into_iter().map(|r| r.ticker).collect();
        assert_eq!(pending, vec!["AAPL", "NVDA"]);
    }

    #[test]
    fn save_persists_processed_flag() {
        let (_dir, path) = write_table(TABLE);
        let mut table = StatusTable::load(&path).unwrap();
        assert!(table.mark_processed("NVDA"));
        assert!(!table.mark_processed("ZZZZ"));
        table.save().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("NVDA,1045810,NVIDIA CORP,True"));

        let reloaded = StatusTable::load(&path).unwrap();
        assert_eq!(reloaded.is_processed("NVDA"), Some(true));
        assert_eq!(reloaded.is_processed("AAPL"), Some(false));
    }

    #[test]
    fn duplicate_tickers_are_rejected() {
        let (_dir, path) =
            write_table("ticker,cik_str,title,processed\nA,1,x,False\nA,2,y,False\n");
        assert!(matches!(
            StatusTable::load(&path),
            Err(StorageError::DuplicateTicker(t)) if t == "A"
        ));
    }

    #[test]
    fn missing_table_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StatusTable::load(dir.path().join("absent.csv")).is_err());
    }
}
