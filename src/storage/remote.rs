// src/storage/remote.rs
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::edgar::filing::FilingRecord;
use crate::utils::error::StorageError;

/// Destination for parsed filing rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &FilingRecord) -> Result<(), StorageError>;
}

/// Inserts rows through a Supabase (PostgREST) table endpoint.
pub struct SupabaseStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn insert(&self, record: &FilingRecord) -> Result<(), StorageError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected { status, body });
        }
        Ok(())
    }
}

/// Used when no store credentials are configured; rows are dropped.
pub struct DisabledStore;

#[async_trait]
impl RecordStore for DisabledStore {
    async fn insert(&self, record: &FilingRecord) -> Result<(), StorageError> {
        tracing::debug!(
            "Record store disabled, not inserting {} - {}",
            record.ticker,
            record.accession_number
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_targets_rest_table() {
        let store =
            SupabaseStore::new("https://example.supabase.co/", "key", "reports_10k").unwrap();
        assert_eq!(store.endpoint, "https://example.supabase.co/rest/v1/reports_10k");
    }

    #[tokio::test]
    async fn disabled_store_accepts_everything() {
        let record = FilingRecord {
            ticker: "AAPL".to_string(),
            cik: "0000320193".to_string(),
            year: 2020,
            accession_number: "000096".to_string(),
            section_label: "MD&A".to_string(),
            section_text: String::new(),
            frequency_map: Default::default(),
        };
        tokio_test::assert_ok!(DisabledStore.insert(&record).await);
    }
}
