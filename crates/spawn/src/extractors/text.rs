//! Text file metadata extractor.
//!
//! Reads a capped prefix of the file and derives line/word/character
//! counts, a coarse stop-word-based language guess, and a naive
//! frequency-ranked keyword list.

use crate::document::Fragment;
use crate::registry::MetadataExtractor;
use crate::Result;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::path::Path;
use tracing::error;

const DEFAULT_MAX_CONTENT_LENGTH: usize = 10_000;
const PREVIEW_LENGTH: usize = 1_000;
const MAX_KEYWORDS: usize = 10;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("static regex"));
static KEYWORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w{3,}\b").expect("static regex"));

const ENGLISH_WORDS: [&str; 8] = ["the", "and", "is", "in", "to", "of", "that", "for"];
const SPANISH_WORDS: [&str; 8] = ["el", "la", "es", "en", "y", "de", "que", "por"];
const FRENCH_WORDS: [&str; 8] = ["le", "la", "est", "en", "et", "de", "que", "pour"];

const STOP_WORDS: [&str; 13] = [
    "the", "and", "is", "in", "to", "of", "that", "for", "on", "with", "as", "this", "by",
];

/// Extract metadata from text files.
pub struct TextExtractor {
    max_content_length: usize,
}

impl TextExtractor {
    pub fn new() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }

    /// Cap the number of characters read from each file.
    pub fn with_max_content_length(max_content_length: usize) -> Self {
        Self { max_content_length }
    }

    fn detect_language(&self, content: &str) -> &'static str {
        let lowered = content.to_lowercase();
        let mut english = 0usize;
        let mut spanish = 0usize;
        let mut french = 0usize;

        for word in WORD_RE.find_iter(&lowered) {
            let word = word.as_str();
            if ENGLISH_WORDS.contains(&word) {
                english += 1;
            }
            if SPANISH_WORDS.contains(&word) {
                spanish += 1;
            }
            if FRENCH_WORDS.contains(&word) {
                french += 1;
            }
        }

        if english > spanish && english > french {
            "en"
        } else if spanish > english && spanish > french {
            "es"
        } else if french > english && french > spanish {
            "fr"
        } else {
            "unknown"
        }
    }

    fn extract_keywords(&self, content: &str) -> Vec<String> {
        let lowered = content.to_lowercase();

        // Insertion order of the frequency table breaks ties by first
        // encounter once the stable sort runs.
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for word in KEYWORD_RE.find_iter(&lowered) {
            let word = word.as_str();
            if STOP_WORDS.contains(&word) {
                continue;
            }
            *counts.entry(word).or_insert(0) += 1;
        }

        let mut sorted: Vec<(&str, usize)> = counts.into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));

        sorted
            .into_iter()
            .take(MAX_KEYWORDS)
            .map(|(word, _)| word.to_string())
            .collect()
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor for TextExtractor {
    fn name(&self) -> &str {
        "text-extractor"
    }

    fn supported_extensions(&self) -> &[&str] {
        &[
            ".txt", ".md", ".rst", ".csv", ".json", ".xml", ".html", ".htm", ".yaml", ".yml",
        ]
    }

    fn supported_mime_prefixes(&self) -> &[&str] {
        &["text/"]
    }

    fn extract(&self, path: &Path) -> Result<Fragment> {
        let mut fragment = Fragment::new();

        let content = match std::fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                truncate_chars(&text, self.max_content_length)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "error extracting text metadata");
                return Ok(fragment);
            }
        };

        fragment.insert(
            "content_preview".to_string(),
            json!(truncate_chars(&content, PREVIEW_LENGTH)),
        );
        fragment.insert(
            "line_count".to_string(),
            json!(content.matches('\n').count() + 1),
        );
        fragment.insert(
            "word_count".to_string(),
            json!(WORD_RE.find_iter(&content).count()),
        );
        fragment.insert("char_count".to_string(), json!(content.chars().count()));
        fragment.insert("language".to_string(), json!(self.detect_language(&content)));
        fragment.insert("keywords".to_string(), json!(self.extract_keywords(&content)));

        Ok(fragment)
    }
}

fn truncate_chars(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}
