// src/storage/mod.rs
pub mod remote;
pub mod staging;
pub mod status;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::edgar::filing::FilingRecord;
use crate::utils::error::StorageError;

pub use remote::{DisabledStore, RecordStore, SupabaseStore};
pub use staging::FilingStaging;
pub use status::{StatusTable, TickerStatus};

/// Flat row written to a ticker's output artifact.
#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    ticker: &'a str,
    cik: &'a str,
    year: i32,
    accession_number: &'a str,
    section_label: &'a str,
    section_text: &'a str,
    word_frequency: String,
    extracted_at: &'a str,
}

/// Writes one artifact per successfully processed ticker.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn artifact_path(&self, ticker: &str) -> PathBuf {
        self.base_dir.join(format!("{}.csv", ticker))
    }

    /// Saves a ticker's records, replacing any earlier artifact for it
    pub fn save_ticker_table(
        &self,
        ticker: &str,
        records: &[FilingRecord],
    ) -> Result<PathBuf, StorageError> {
        let file_path = self.artifact_path(ticker);
        let extracted_at = chrono::Utc::now().to_rfc3339();

        let mut writer = csv::Writer::from_path(&file_path)?;
        for record in records {
            let word_frequency = serde_json::to_string(&record.frequency_map)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            writer.serialize(OutputRow {
                ticker: &record.ticker,
                cik: &record.cik,
                year: record.year,
                accession_number: &record.accession_number,
                section_label: &record.section_label,
                section_text: &record.section_text,
                word_frequency,
                extracted_at: &extracted_at,
            })?;
        }
        writer.flush()?;

        tracing::info!("Saved {} records for {} to {}", records.len(), ticker, file_path.display());

        Ok(file_path)
    }
}
