// src/extractors/frequency.rs
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::utils::error::AppError;

/// Term -> count, only for terms that occur at least once.
pub type FrequencyMap = BTreeMap<String, u32>;

/// The fixed keyword vocabulary, loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: HashSet<String>,
}

impl Vocabulary {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Loads a JSON array of words. A missing or malformed file is fatal at startup.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read vocabulary file {}: {}", path.display(), e))
        })?;
        let terms: Vec<String> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!(
                "Vocabulary file {} is not a JSON list of words: {}",
                path.display(),
                e
            ))
        })?;
        tracing::info!("Loaded {} vocabulary terms from {}", terms.len(), path.display());
        Ok(Self::new(terms))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }
}

/// Counts whitespace-delimited tokens that exactly equal a vocabulary term.
/// No case folding and no punctuation stripping.
pub fn count(text: &str, vocabulary: &Vocabulary) -> FrequencyMap {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for token in text.split_whitespace() {
        if vocabulary.contains(token) {
            *counts.entry(token).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(term, n)| (term.to_string(), n))
        .collect()
}
