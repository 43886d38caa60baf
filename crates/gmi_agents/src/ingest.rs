//! Document text extraction.
//!
//! The role agents only need the text of an uploaded document. Rich formats
//! (PDF, DOCX, images, audio) need external extraction backends; the built-in
//! [`PlainTextExtractor`] covers text-like types and rejects the rest with
//! [`AgentError::UnsupportedFormat`].

use std::path::Path;

use gmi_core::{mime_from_name, DEFAULT_MIME_TYPE};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

/// Counts describing an extracted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub word_count: usize,
    pub line_count: usize,
    pub character_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,
}

impl ExtractionStats {
    fn of(text: &str) -> Self {
        Self {
            word_count: text.split_whitespace().count(),
            line_count: text.split('\n').count(),
            character_count: text.chars().count(),
            columns: None,
        }
    }
}

/// Text pulled out of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub text: String,
    /// Pages, rows or segments, depending on the format. One for flat text.
    pub units: usize,
    pub stats: ExtractionStats,
}

impl Extraction {
    /// One-line description for logs and prompts.
    pub fn summary(&self) -> String {
        format!(
            "{} words, {} lines, {} characters",
            self.stats.word_count, self.stats.line_count, self.stats.character_count
        )
    }
}

/// Turns a document into text.
pub trait DocumentExtractor: Send + Sync {
    fn extract_bytes(&self, name: &str, mime_type: &str, bytes: &[u8]) -> AgentResult<Extraction>;

    fn extract(&self, path: &Path) -> AgentResult<Extraction> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_from_name(&name);
        self.extract_bytes(&name, mime_type, &bytes)
    }
}

/// Extractor for text, Markdown, CSV and JSON documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// MIME types this extractor reads.
    pub fn supported_types() -> &'static [&'static str] {
        &["text/plain", "text/markdown", "text/csv", "application/json"]
    }
}

impl DocumentExtractor for PlainTextExtractor {
    fn extract_bytes(&self, name: &str, mime_type: &str, bytes: &[u8]) -> AgentResult<Extraction> {
        let declared = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        // Generic types say nothing; the file name may.
        let effective = if declared.is_empty() || declared == DEFAULT_MIME_TYPE {
            mime_from_name(name).to_string()
        } else {
            declared
        };

        if !Self::supported_types().contains(&effective.as_str()) {
            return Err(AgentError::UnsupportedFormat(effective));
        }

        let text = String::from_utf8_lossy(bytes).into_owned();
        match effective.as_str() {
            "text/csv" => Ok(extract_csv(text)),
            "application/json" => Ok(extract_json(text)),
            _ => {
                let stats = ExtractionStats::of(&text);
                Ok(Extraction {
                    text,
                    units: 1,
                    stats,
                })
            }
        }
    }
}

fn extract_csv(text: String) -> Extraction {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let columns = lines.next().map(|header| header.split(',').count()).unwrap_or(0);
    let rows = lines.count();

    let mut stats = ExtractionStats::of(&text);
    stats.columns = Some(columns);
    Extraction {
        text,
        units: rows,
        stats,
    }
}

fn extract_json(text: String) -> Extraction {
    // Pretty-print valid JSON so the model sees structure; keep anything else verbatim.
    let text = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or(text);
    let stats = ExtractionStats::of(&text);
    Extraction {
        text,
        units: 1,
        stats,
    }
}
