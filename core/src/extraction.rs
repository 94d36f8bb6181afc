//! Extractor output: the ordered message records a merge pass consumes.
//!
//! Records arrive either as one JSON array or as JSON Lines (one record per
//! line, blank lines ignored). Field names are camelCase.

use crate::catalog::{Location, MessageKey};
use crate::formats::{FileFormat, FormatError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedMessage {
    pub context: String,
    pub source_text: String,
    #[serde(default)]
    pub disambiguation: String,
    #[serde(default)]
    pub numerus: bool,
    pub location: Location,
    /// Developer comment attached to the message in the sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_comment: Option<String>,
}

impl ExtractedMessage {
    pub fn new(
        context: impl Into<String>,
        source_text: impl Into<String>,
        file_path: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Self {
            context: context.into(),
            source_text: source_text.into(),
            disambiguation: String::new(),
            numerus: false,
            location: Location::new(file_path, line_number),
            extra_comment: None,
        }
    }

    pub fn with_disambiguation(mut self, disambiguation: impl Into<String>) -> Self {
        self.disambiguation = disambiguation.into();
        self
    }

    pub fn plural(mut self) -> Self {
        self.numerus = true;
        self
    }

    pub fn with_extra_comment(mut self, comment: impl Into<String>) -> Self {
        self.extra_comment = Some(comment.into());
        self
    }

    pub fn key(&self) -> MessageKey {
        MessageKey::new(
            self.context.clone(),
            self.source_text.clone(),
            self.disambiguation.clone(),
        )
    }
}

/// Parse extractor output. `FileFormat::Jsonl` reads one record per line,
/// anything else is treated as a JSON array.
pub fn parse_extraction(
    content: &str,
    format: FileFormat,
) -> Result<Vec<ExtractedMessage>, FormatError> {
    if format == FileFormat::Jsonl {
        return parse_lines(content);
    }
    serde_json::from_str(content).map_err(|err| FormatError::Extraction {
        line: err.line(),
        message: err.to_string(),
    })
}

fn parse_lines(content: &str) -> Result<Vec<ExtractedMessage>, FormatError> {
    let mut messages = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let message = serde_json::from_str(trimmed).map_err(|err| FormatError::Extraction {
            line: idx + 1,
            message: err.to_string(),
        })?;
        messages.push(message);
    }
    Ok(messages)
}
