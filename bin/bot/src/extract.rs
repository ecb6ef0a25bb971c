//! Basic document text extraction.
//!
//! Richer extraction (pdf parsing, office formats, OCR) belongs to an
//! external collaborator; this built-in extractor handles the text-shaped
//! formats directly and rejects everything else.

use async_trait::async_trait;
use copper_sparrow_dispatch::{DocumentTextExtractor, ExtractError};
use std::path::Path;

const TEXT_MIME_PREFIXES: &[&str] = &["text/"];
const TEXT_MIME_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/x-yaml",
    "application/javascript",
];

/// Reads text-shaped documents as UTF-8 and normalizes whitespace.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    fn is_text(mime_type: &str) -> bool {
        TEXT_MIME_PREFIXES.iter().any(|p| mime_type.starts_with(p))
            || TEXT_MIME_TYPES.contains(&mime_type)
    }

    fn clean(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut blank_run = 0usize;
        for line in text.replace("\r\n", "\n").replace('\t', " ").lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            out.push_str(line);
            out.push('\n');
        }
        out.trim().to_string()
    }
}

#[async_trait]
impl DocumentTextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path, mime_type: &str) -> Result<String, ExtractError> {
        if !Self::is_text(mime_type) {
            return Err(ExtractError::Unsupported {
                mime_type: mime_type.to_string(),
            });
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExtractError::Failed {
                reason: e.to_string(),
            })?;
        Ok(Self::clean(&raw))
    }
}
