// src/extractors/section.rs

// --- Imports ---
use once_cell::sync::Lazy;
use scraper::{node::Node, ElementRef, Html, Selector};

// --- Constants ---
/// Recorded in place of the section text when the label is absent from a filing.
pub const SECTION_NOT_FOUND: &str = "Section not found";

// Elements whose text is never part of the filing narrative
const NON_TEXT_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

// --- CSS Selectors (Lazy Static) ---
static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to compile BODY_SELECTOR")
});

// --- Section Table ---
/// A section is located by its label and runs until the earliest of its end markers
/// that follows it. Markers are case-sensitive, so each accepted spelling is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub next_markers: &'static [&'static str],
}

pub const MDNA: SectionSpec = SectionSpec {
    name: "MD&A",
    label: "ITEM 7.",
    next_markers: &["ITEM 8."],
};

// Filings print the heading either way.
pub const RISK_FACTORS: SectionSpec = SectionSpec {
    name: "Risk Factors",
    label: "Risk Factors",
    next_markers: &["Item 1B.", "ITEM 1B."],
};

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSection {
    pub label: String,        // e.g., "MD&A"
    pub text: Option<String>, // None when the label never appears
}

impl ExtractedSection {
    /// The section text, or the "Section not found" sentinel.
    pub fn text_or_sentinel(&self) -> &str {
        self.text.as_deref().unwrap_or(SECTION_NOT_FOUND)
    }
}

// --- Pure Text Functions ---

/// Collapses every whitespace run (newlines and tabs included) to one space and trims.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the text between `section.label` and the first end marker after it,
/// or to the end of the document when no marker follows.
///
/// Matching is a plain substring search on the normalized text, so a label
/// embedded in a longer word still matches.
pub fn extract(full_text: &str, section: &SectionSpec) -> Option<String> {
    let text = normalize_whitespace(full_text);
    let start = text.find(section.label)? + section.label.len();
    let rest = &text[start..];
    let end = section
        .next_markers
        .iter()
        .filter_map(|marker| rest.find(*marker))
        .min()
        .unwrap_or(rest.len());
    let body = &rest[..end];
    Some(body.trim().to_string())
}

/// Parses filing markup and joins every non-empty text node with a single space.
pub fn flatten_markup(html_content: &str) -> String {
    let document = Html::parse_document(html_content);
    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());
    collect_text(root)
}

fn collect_text(root: ElementRef) -> String {
    let mut pieces: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Node::Text(text_node) = node.value() else {
            continue;
        };
        let inside_non_text = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_TEXT_ELEMENTS.contains(&el.name()))
        });
        if inside_non_text {
            continue;
        }
        let trimmed = text_node.text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }
    normalize_whitespace(&pieces.join(" "))
}

// --- Extractor ---
/// Extracts one configured section from raw filing markup. Holds no per-document state.
#[derive(Debug, Clone, Copy)]
pub struct SectionExtractor {
    section: SectionSpec,
}

impl SectionExtractor {
    pub fn new(section: SectionSpec) -> Self {
        Self { section }
    }

    pub fn extract(&self, html_content: &str) -> ExtractedSection {
        let full_text = flatten_markup(html_content);
        let text = extract(&full_text, &self.section);
        if text.is_none() {
            tracing::debug!(
                "'{}' label '{}' not found in document",
                self.section.name,
                self.section.label
            );
        }
        ExtractedSection {
            label: self.section.name.to_string(),
            text,
        }
    }
}

impl Default for SectionExtractor {
    fn default() -> Self {
        Self::new(MDNA)
    }
}
