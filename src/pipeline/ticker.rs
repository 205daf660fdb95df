// src/pipeline/ticker.rs
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::edgar::client::FilingRetriever;
use crate::edgar::filing::{self, FilingRecord};
use crate::extractors::{frequency, SectionExtractor, Vocabulary};
use crate::storage::{FilingStaging, RecordStore, TickerStatus};
use crate::utils::error::ExtractError;

/// What one ticker task hands back to the orchestrator.
#[derive(Debug)]
pub struct TickerOutcome {
    pub ticker: String,
    pub cik: String,
    /// `None` when no filing produced a record. Not an error.
    pub table: Option<Vec<FilingRecord>>,
}

/// Turns one ticker's staged 10-K filings into records.
pub struct TickerProcessor {
    retriever: Arc<dyn FilingRetriever>,
    store: Arc<dyn RecordStore>,
    staging: FilingStaging,
    extractor: SectionExtractor,
    vocabulary: Arc<Vocabulary>,
}

impl TickerProcessor {
    pub fn new(
        retriever: Arc<dyn FilingRetriever>,
        store: Arc<dyn RecordStore>,
        staging: FilingStaging,
        extractor: SectionExtractor,
        vocabulary: Arc<Vocabulary>,
    ) -> Self {
        Self {
            retriever,
            store,
            staging,
            extractor,
            vocabulary,
        }
    }

    /// Never fails: retrieval, parse and store errors are logged and contained here.
    pub async fn process(&self, status: TickerStatus) -> TickerOutcome {
        let TickerStatus { ticker, cik, title, .. } = status;
        tracing::info!("Processing {} ({}), CIK {}", ticker, title, cik);

        match self.retriever.download_ticker_filings(&ticker, &cik).await {
            Ok(count) => tracing::debug!("Downloaded {} new filings for {}", count, ticker),
            Err(e) => {
                tracing::warn!("Error occurred while downloading filings for {}: {}", ticker, e)
            }
        }

        // Directory walk, file reads and DOM parsing block; run them off the async workers.
        let staging = self.staging.clone();
        let extractor = self.extractor;
        let vocabulary = Arc::clone(&self.vocabulary);
        let owner = ticker.clone();
        let parsed = tokio::task::spawn_blocking(move || {
            parse_staged(&staging, extractor, &vocabulary, &owner)
        })
        .await;
        let (records, document_count) = match parsed {
            Ok(parsed) => parsed,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => {
                tracing::error!("Parsing filings for {} was cancelled: {}", ticker, e);
                (Vec::new(), 0)
            }
        };

        for record in &records {
            if let Err(e) = self.store.insert(record).await {
                tracing::error!(
                    "Failed to insert data for {} - {}: {}",
                    record.ticker,
                    record.accession_number,
                    e
                );
            }
        }

        let staging = self.staging.clone();
        let owner = ticker.clone();
        match tokio::task::spawn_blocking(move || staging.clear_ticker(&owner)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Could not clear staged filings for {}: {}", ticker, e),
            Err(e) => {
                tracing::warn!("Clearing staged filings for {} did not finish: {}", ticker, e)
            }
        }

        tracing::info!("{}: {} records from {} documents", ticker, records.len(), document_count);
        TickerOutcome {
            ticker,
            cik,
            table: (!records.is_empty()).then_some(records),
        }
    }
}

/// Enumerates, cleans and parses everything staged for `ticker`. Returns the records,
/// one per accession number, and how many primary documents were seen.
fn parse_staged(
    staging: &FilingStaging,
    extractor: SectionExtractor,
    vocabulary: &Vocabulary,
    ticker: &str,
) -> (Vec<FilingRecord>, usize) {
    let files = staging.collect_ticker_files(ticker).unwrap_or_else(|e| {
        tracing::warn!("Could not list staged filings for {}: {}", ticker, e);
        Vec::new()
    });
    let documents = staging.remove_non_primary(files);

    // Keyed by accession number; a later document replaces an earlier one.
    let mut by_accession: BTreeMap<String, FilingRecord> = BTreeMap::new();
    for path in &documents {
        match parse_document(path, extractor, vocabulary, ticker) {
            Ok(record) => {
                let accession = record.accession_number.clone();
                if by_accession.insert(accession, record).is_some() {
                    tracing::debug!(
                        "Replaced earlier record for {} from {}",
                        ticker,
                        path.display()
                    );
                }
            }
            Err(e) => tracing::warn!("Skipping {} for {}: {}", path.display(), ticker, e),
        }
    }
    (by_accession.into_values().collect(), documents.len())
}

fn parse_document(
    path: &Path,
    extractor: SectionExtractor,
    vocabulary: &Vocabulary,
    ticker: &str,
) -> Result<FilingRecord, ExtractError> {
    let id = filing::parse_identifier(path)?;
    let html = std::fs::read_to_string(path).map_err(|source| ExtractError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let section = extractor.extract(&html);
    let frequency_map = frequency::count(section.text_or_sentinel(), vocabulary);
    Ok(filing::build(id, ticker, &section, frequency_map))
}
