// src/main.rs
mod edgar;
mod extractors;
mod pipeline;
mod storage;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use edgar::client::DEFAULT_USER_AGENT;
use edgar::{EdgarClient, FilingRetriever};
use extractors::section::{MDNA, RISK_FACTORS};
use extractors::{SectionExtractor, SectionSpec, Vocabulary};
use pipeline::{BatchConfig, BatchOrchestrator, TickerProcessor};
use storage::{
    DisabledStore, FilingStaging, RecordStore, StatusTable, StorageManager, SupabaseStore,
};
use utils::AppError;

/// Section to pull out of each 10-K
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SectionArg {
    /// Item 7, Management's Discussion and Analysis
    Mdna,
    /// Item 1A, Risk Factors
    RiskFactors,
}

impl SectionArg {
    fn spec(self) -> SectionSpec {
        match self {
            SectionArg::Mdna => MDNA,
            SectionArg::RiskFactors => RISK_FACTORS,
        }
    }
}

/// Batch extraction of 10-K sections and fraud-keyword frequencies
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Resumable status table (ticker,cik_str,title,processed)
    #[arg(long, default_value = "processing_status.csv")]
    status_file: PathBuf,

    /// JSON list of keywords to count
    #[arg(long, default_value = "words_fraud_constraints.json")]
    vocabulary: PathBuf,

    /// Directory for per-ticker output tables
    #[arg(short, long, default_value = "ticker_data")]
    output_dir: PathBuf,

    /// Directory where downloaded filings are staged
    #[arg(long, default_value = "data")]
    staging_dir: PathBuf,

    /// Tickers per batch
    #[arg(short, long, default_value_t = 10)]
    batch_size: usize,

    /// Lower bound of the pause before each batch, in milliseconds
    #[arg(long, default_value_t = 1000)]
    jitter_min_ms: u64,

    /// Upper bound of the pause before each batch, in milliseconds
    #[arg(long, default_value_t = 2000)]
    jitter_max_ms: u64,

    /// Section to extract
    #[arg(short, long, value_enum, default_value_t = SectionArg::Mdna)]
    section: SectionArg,

    /// Log file, written in addition to stdout
    #[arg(long, default_value = "ticker_processing.log")]
    log_file: PathBuf,

    /// Remote table receiving filing rows
    #[arg(long, default_value = "reports_10k")]
    store_table: String,

    /// User-Agent sent to EDGAR (SEC requires a contact address)
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
}

/// Store credentials come from the environment (or `.env`); without them inserts are skipped.
fn build_record_store(table: &str) -> Result<Arc<dyn RecordStore>, AppError> {
    match (std::env::var("SUPABASE_URL"), std::env::var("SUPABASE_KEY")) {
        (Ok(url), Ok(key)) => {
            tracing::info!("Inserting records into table '{}'", table);
            Ok(Arc::new(SupabaseStore::new(&url, &key, table)?))
        }
        _ => {
            tracing::warn!("SUPABASE_URL / SUPABASE_KEY not set; remote inserts disabled");
            Ok(Arc::new(DisabledStore))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments and pick up .env before anything reads the environment
    let args = Args::parse();
    dotenvy::dotenv().ok();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(&args.log_file)?;
    tracing::info!("Starting processing for args: {:?}", args);

    let config = BatchConfig {
        batch_size: args.batch_size,
        jitter_min: Duration::from_millis(args.jitter_min_ms),
        jitter_max: Duration::from_millis(args.jitter_max_ms),
    };
    config.validate()?;

    // 3. Fatal startup inputs: vocabulary and status table
    let vocabulary = Vocabulary::load(&args.vocabulary)?;
    if vocabulary.is_empty() {
        tracing::warn!(
            "Vocabulary {} is empty; frequency maps will be empty",
            args.vocabulary.display()
        );
    } else {
        tracing::debug!("Counting {} keywords per section", vocabulary.len());
    }
    let vocabulary = Arc::new(vocabulary);
    let mut status = StatusTable::load(&args.status_file).map_err(|e| {
        AppError::Config(format!("Cannot load status table {}: {}", args.status_file.display(), e))
    })?;

    // 4. Collaborators, built once and shared by every task
    let staging = FilingStaging::new(&args.staging_dir);
    let retriever: Arc<dyn FilingRetriever> =
        Arc::new(EdgarClient::new(&args.user_agent, staging.clone())?);
    let store = build_record_store(&args.store_table)?;
    let storage = StorageManager::new(&args.output_dir)?;

    let section = args.section.spec();
    tracing::info!(
        "Extracting '{}' ('{}' up to '{}')",
        section.name,
        section.label,
        section.next_markers.join("' or '")
    );

    let processor = TickerProcessor::new(
        Arc::clone(&retriever),
        store,
        staging,
        SectionExtractor::new(section),
        vocabulary,
    );

    // 5. Run all batches
    let orchestrator = BatchOrchestrator::new(config, retriever, Arc::new(processor), storage);
    let summary = orchestrator.run(&mut status).await?;

    tracing::info!(
        "Processing finished. {} pending, {} succeeded, {} empty, {} failed, {} batches",
        summary.pending,
        summary.succeeded,
        summary.empty,
        summary.failed,
        summary.batches
    );

    Ok(())
}
