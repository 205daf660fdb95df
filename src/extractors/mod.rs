// src/extractors/mod.rs
pub mod frequency;
pub mod section;

// Re-export key extraction types for convenience
pub use frequency::{FrequencyMap, Vocabulary};
pub use section::{ExtractedSection, SectionExtractor, SectionSpec};
