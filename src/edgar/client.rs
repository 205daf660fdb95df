// src/edgar/client.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::edgar::models::{pad_cik, CompanySubmission};
use crate::storage::staging::FilingStaging;
use crate::utils::error::EdgarError;

pub const DEFAULT_USER_AGENT: &str = "tenk-sections research-contact@example.com";
const SUBMISSIONS_BASE_URL: &str = "https://data.sec.gov";
// SEC allows 10 requests/second per client. Every task shares one spacing of >100ms.
const EDGAR_REQUEST_DELAY_MS: u64 = 150;

/// Fetches filings into the local staging area.
#[async_trait]
pub trait FilingRetriever: Send + Sync {
    /// One call per batch covering every CIK in it. Best-effort.
    async fn download_filings_for_batch(&self, ciks: &[String]) -> Result<(), EdgarError>;

    /// Stages the primary document of each 10-K filed by `cik`. Returns how many were downloaded.
    async fn download_ticker_filings(&self, ticker: &str, cik: &str) -> Result<usize, EdgarError>;

    /// Drops whatever the batch prefetch left behind.
    /// Called once every task of the batch has finished.
    async fn release_batch(&self) -> Result<(), EdgarError> {
        Ok(())
    }
}

/// Spaces out requests from every task sharing the client.
struct RequestThrottle {
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl RequestThrottle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Reserves the next free send slot and sleeps until it arrives.
    async fn wait(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let slot = (*next_slot).max(Instant::now());
            *next_slot = slot + self.interval;
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// EDGAR client with the mandatory User-Agent and a client-wide rate limit.
pub struct EdgarClient {
    client: reqwest::Client,
    staging: FilingStaging,
    throttle: RequestThrottle,
    submissions_base: String,
}

impl EdgarClient {
    pub fn new(user_agent: &str, staging: FilingStaging) -> Result<Self, EdgarError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent) // Set the required User-Agent
            .timeout(Duration::from_secs(60))
            .build()?;
        tracing::debug!("Using User-Agent: {}", user_agent);
        Ok(Self {
            client,
            staging,
            throttle: RequestThrottle::new(Duration::from_millis(EDGAR_REQUEST_DELAY_MS)),
            submissions_base: SUBMISSIONS_BASE_URL.to_string(),
        })
    }

    #[cfg(test)]
    fn with_submissions_base(mut self, base: &str) -> Self {
        self.submissions_base = base.trim_end_matches('/').to_string();
        self
    }

    /// GET after waiting for a free throttle slot; non-2xx statuses become errors.
    async fn get_text(&self, url: &str) -> Result<String, EdgarError> {
        self.throttle.wait().await;

        let response = self
            .client
            .get(url)
            // SEC uses various content types, but often text/html for filings
            .header(header::ACCEPT, "application/json,text/html,text/plain,*/*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("HTTP error status: {} for URL: {}", status, url);
            if status == reqwest::StatusCode::FORBIDDEN
                || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            {
                tracing::warn!("Received {} - check User-Agent and rate limits.", status);
                return Err(EdgarError::RateLimited);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(EdgarError::FilingDocNotFound(url.to_string()));
            }
            return Err(EdgarError::Http(status));
        }

        let body = response.text().await?;
        tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Downloads and parses the submission index for `cik`. Returns the raw JSON as well.
    async fn fetch_submissions(
        &self,
        cik: &str,
    ) -> Result<(String, CompanySubmission), EdgarError> {
        let url = format!("{}/submissions/CIK{}.json", self.submissions_base, pad_cik(cik));
        let raw = self.get_text(&url).await?;
        let submission = serde_json::from_str(&raw)
            .map_err(|e| EdgarError::Parse(format!("{}: {}", url, e)))?;
        Ok((raw, submission))
    }

    /// Prefetch step: fetches the index for `cik` and replaces the cached copy atomically.
    async fn cache_submissions(&self, cik: &str) -> Result<(), EdgarError> {
        let (raw, _) = self.fetch_submissions(cik).await?;

        let path = self.staging.submissions_path(cik);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, raw).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }

    /// Reads the index cached by the batch prefetch. A missing or unreadable cache is
    /// fetched again; ticker tasks never write the shared cache.
    async fn load_submissions(&self, cik: &str) -> Result<CompanySubmission, EdgarError> {
        let path = self.staging.submissions_path(cik);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(submission) => return Ok(submission),
                Err(e) => {
                    tracing::warn!("Discarding corrupt submissions cache {}: {}", path.display(), e)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Cannot read submissions cache {}: {}", path.display(), e),
        }
        let (_, submission) = self.fetch_submissions(cik).await?;
        Ok(submission)
    }
}

#[async_trait]
impl FilingRetriever for EdgarClient {
    async fn download_filings_for_batch(&self, ciks: &[String]) -> Result<(), EdgarError> {
        let mut failed = 0;
        for cik in ciks {
            if let Err(e) = self.cache_submissions(cik).await {
                tracing::warn!("Could not prefetch submissions for CIK {}: {}", cik, e);
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(EdgarError::BatchIncomplete { failed, total: ciks.len() });
        }
        Ok(())
    }

    async fn download_ticker_filings(&self, ticker: &str, cik: &str) -> Result<usize, EdgarError> {
        let submission = self.load_submissions(cik).await?;
        let filings = submission.ten_k_filings(ticker);
        tracing::info!("Found {} 10-K filings for {}", filings.len(), ticker);

        let mut downloaded = 0;
        let mut last_error = None;
        for filing in &filings {
            let dest = self.staging.document_path(ticker, &filing.accession_number);
            if dest.exists() {
                tracing::debug!("Already staged: {}", dest.display());
                continue;
            }

            let url = filing.primary_doc_url();
            tracing::debug!(
                "Fetching {} {} of {} filed {}",
                filing.form_type,
                filing.accession_number,
                filing.company_name,
                filing.filing_date
            );
            match self.get_text(&url).await {
                Ok(content) => {
                    if let Some(dir) = dest.parent() {
                        tokio::fs::create_dir_all(dir).await?;
                    }
                    tokio::fs::write(&dest, content).await?;
                    downloaded += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to download {} ({}) for {}: {}",
                        filing.accession_number,
                        url,
                        ticker,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if downloaded == 0 => Err(e),
            _ => Ok(downloaded),
        }
    }

    async fn release_batch(&self) -> Result<(), EdgarError> {
        self.staging.clear_submissions()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinSet;

    use super::*;

    const SUBMISSION_JSON: &str = r#"{
        "cik": "320193",
        "name": "Apple Inc.",
        "filings": { "recent": {
            "accessionNumber": ["0000320193-23-000106"],
            "filingDate": ["2023-11-03"],
            "form": ["10-K"],
            "primaryDocument": ["aapl-20230930.htm"]
        } }
    }"#;

    /// Local HTTP server answering every request with `body`.
    /// Returns its base URL and the arrival time of each connection.
    async fn serve(body: &'static str) -> (String, Arc<std::sync::Mutex<Vec<Instant>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let arrivals = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&arrivals);
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.lock().unwrap().push(Instant::now());
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (base, arrivals)
    }

    fn write_cache(staging: &FilingStaging, contents: &str) {
        let cached = staging.submissions_path("320193");
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, contents).unwrap();
    }

    #[tokio::test]
    async fn cached_submissions_are_used_without_network() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = FilingStaging::new(tmp.path());
        write_cache(&staging, SUBMISSION_JSON);

        let client = EdgarClient::new(DEFAULT_USER_AGENT, staging).unwrap();
        let submission = client.load_submissions("320193").await.unwrap();
        assert_eq!(submission.name, "Apple Inc.");
        assert_eq!(submission.ten_k_filings("AAPL").len(), 1);
    }

    #[tokio::test]
    async fn corrupt_cache_is_fetched_again() {
        let (base, arrivals) = serve(SUBMISSION_JSON).await;
        let tmp = tempfile::tempdir().unwrap();
        let staging = FilingStaging::new(tmp.path());
        write_cache(&staging, &SUBMISSION_JSON[..40]);

        let client = EdgarClient::new(DEFAULT_USER_AGENT, staging)
            .unwrap()
            .with_submissions_base(&base);
        let submission = client.load_submissions("320193").await.unwrap();
        assert_eq!(submission.name, "Apple Inc.");
        assert_eq!(arrivals.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn prefetch_writes_cache_and_release_clears_it() {
        let (base, _) = serve(SUBMISSION_JSON).await;
        let tmp = tempfile::tempdir().unwrap();
        let staging = FilingStaging::new(tmp.path());
        let cached = staging.submissions_path("320193");

        let client = EdgarClient::new(DEFAULT_USER_AGENT, staging)
            .unwrap()
            .with_submissions_base(&base);
        client
            .download_filings_for_batch(&["320193".to_string()])
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&cached).unwrap(), SUBMISSION_JSON);
        assert!(!cached.with_extension("json.tmp").exists());

        client.release_batch().await.unwrap();
        assert!(!cached.exists());
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_rate_limit() {
        let (base, arrivals) = serve(SUBMISSION_JSON).await;
        let tmp = tempfile::tempdir().unwrap();
        let client = Arc::new(
            EdgarClient::new(DEFAULT_USER_AGENT, FilingStaging::new(tmp.path()))
                .unwrap()
                .with_submissions_base(&base),
        );

        let mut tasks = JoinSet::new();
        for _ in 0..4 {
            let client = Arc::clone(&client);
            tasks.spawn(async move { client.fetch_submissions("320193").await.map(|_| ()) });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let arrivals = arrivals.lock().unwrap();
        assert_eq!(arrivals.len(), 4);
        let spread = *arrivals.iter().max().unwrap() - *arrivals.iter().min().unwrap();
        assert!(spread >= Duration::from_millis(3 * EDGAR_REQUEST_DELAY_MS - 50), "{:?}", spread);
    }

    #[tokio::test]
    async fn throttle_spaces_waiters_by_interval() {
        let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(40)));
        let started = Instant::now();
        let mut tasks = JoinSet::new();
        for _ in 0..5 {
            let throttle = Arc::clone(&throttle);
            tasks.spawn(async move {
                throttle.wait().await;
                Instant::now()
            });
        }
        let mut finished = Vec::new();
        while let Some(at) = tasks.join_next().await {
            finished.push(at.unwrap());
        }
        let last = finished.into_iter().max().unwrap();
        assert!(last - started >= Duration::from_millis(160));
    }

    #[tokio::test]
    async fn already_staged_documents_are_not_downloaded_again() {
        let tmp = tempfile::tempdir().unwrap();
        let staging = FilingStaging::new(tmp.path());
        write_cache(&staging, SUBMISSION_JSON);
        let doc = staging.document_path("AAPL", "0000320193-23-000106");
        std::fs::create_dir_all(doc.parent().unwrap()).unwrap();
        std::fs::write(&doc, "<html></html>").unwrap();

        let client = EdgarClient::new(DEFAULT_USER_AGENT, staging).unwrap();
        let downloaded = client.download_ticker_filings("AAPL", "320193").await.unwrap();
        assert_eq!(downloaded, 0);
    }
}
