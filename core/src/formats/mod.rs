/// Persisted catalog formats and input file kinds
pub mod ts;

use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Structural problem in a catalog document, with the offending element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error in <{element}> at line {line}, column {column}: {message}")]
pub struct ParseError {
    /// Element path, e.g. `TS/context[Dialog]/message[2]/translation`
    pub element: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Extraction record error at line {line}: {message}")]
    Extraction { line: usize, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Qt Linguist translation source
    Ts,
    Json,
    Jsonl,
    Unknown,
}

impl FileFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "ts" => Self::Ts,
            "json" => Self::Json,
            "jsonl" | "ndjson" => Self::Jsonl,
            _ => Self::Unknown,
        }
    }

    /// Detect format from path
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }
}

/// Reads and writes one persisted catalog document format.
pub trait CatalogFormat: Send + Sync {
    fn parse(&self, content: &str) -> Result<Catalog, FormatError>;

    /// Emitting never fails; output is in the format's canonical layout.
    fn emit(&self, catalog: &Catalog) -> String;

    fn format(&self) -> FileFormat;
}

/// Get the catalog handler for a format, if it is a catalog format.
pub fn get_handler(format: FileFormat) -> Option<Box<dyn CatalogFormat>> {
    match format {
        FileFormat::Ts => Some(Box::new(ts::TsHandler::new())),
        FileFormat::Json | FileFormat::Jsonl | FileFormat::Unknown => None,
    }
}
