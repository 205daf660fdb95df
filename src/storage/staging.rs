// src/storage/staging.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::edgar::models::pad_cik;

const FILINGS_DIR: &str = "sec-edgar-filings";
const SUBMISSIONS_DIR: &str = "submissions";
const FORM_DIR: &str = "10-K";
const PRIMARY_DOCUMENT: &str = "primary-document.html";
const PRIMARY_EXTENSIONS: [&str; 2] = ["html", "htm"];

/// Local directory where retrieved filings wait to be parsed.
///
/// Layout: `<root>/sec-edgar-filings/<TICKER>/10-K/<CIK>-<YY>-<SEQ>/primary-document.html`,
/// plus submission indexes cached by the batch prefetch under `<root>/submissions/`.
/// Everything below a ticker's directory belongs to that ticker alone. The submissions
/// cache is written only between batches and read by the tasks of the current batch.
#[derive(Debug, Clone)]
pub struct FilingStaging {
    root: PathBuf,
}

impl FilingStaging {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn ticker_dir(&self, ticker: &str) -> PathBuf {
        self.root.join(FILINGS_DIR).join(ticker)
    }

    pub fn document_path(&self, ticker: &str, accession_number: &str) -> PathBuf {
        self.ticker_dir(ticker)
            .join(FORM_DIR)
            .join(accession_number)
            .join(PRIMARY_DOCUMENT)
    }

    pub fn submissions_path(&self, cik: &str) -> PathBuf {
        self.root
            .join(SUBMISSIONS_DIR)
            .join(format!("CIK{}.json", pad_cik(cik)))
    }

    /// Every file staged for `ticker`, sorted by path.
    /// A ticker with nothing staged yields an empty list.
    pub fn collect_ticker_files(&self, ticker: &str) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let dir = self.ticker_dir(ticker);
        if dir.is_dir() {
            walk(&dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    /// Deletes non-primary artifacts and returns the primary documents that remain.
    pub fn remove_non_primary(&self, files: Vec<PathBuf>) -> Vec<PathBuf> {
        let (primary, other): (Vec<_>, Vec<_>) = files.into_iter().partition(|p| is_primary(p));
        for path in other {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed non-primary artifact {}", path.display()),
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        primary
    }

    /// Removes everything staged for `ticker`.
    pub fn clear_ticker(&self, ticker: &str) -> io::Result<()> {
        remove_dir(&self.ticker_dir(ticker))
    }

    /// Removes the cached submission indexes of the finished batch.
    pub fn clear_submissions(&self) -> io::Result<()> {
        remove_dir(&self.root.join(SUBMISSIONS_DIR))
    }
}

fn remove_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

pub fn is_primary(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PRIMARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
