/// Catalog and extraction files on disk
use crate::backup::{backup_and_swap, BackupError, BackupOutcome};
use crate::catalog::Catalog;
use crate::encoding::{EncodingError, FileMetadata};
use crate::extraction::{parse_extraction, ExtractedMessage};
use crate::formats::{ts, FileFormat, FormatError};
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// `app_pt_BR.ts` -> `pt_BR`
static LANGUAGE_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_([a-z]{2,3}(?:[_-][A-Za-z0-9]{2,8})?)$").expect("valid language suffix regex")
});

#[derive(Debug, Error)]
pub enum CatalogFileError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("{}: {source}", .path.display())]
    Encoding { path: PathBuf, source: EncodingError },

    #[error("{}: {source}", .path.display())]
    Format { path: PathBuf, source: FormatError },

    #[error("Cannot determine catalog language for {}; pass it explicitly", .0.display())]
    UnknownLanguage(PathBuf),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

/// A catalog together with the byte layout of the file it came from.
#[derive(Debug, Clone)]
pub struct CatalogFile {
    pub path: PathBuf,
    pub catalog: Catalog,
    pub metadata: FileMetadata,
    /// False when the file did not exist and an empty catalog was created
    pub existed: bool,
}

impl CatalogFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogFileError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| CatalogFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (text, metadata) = FileMetadata::decode(&bytes).map_err(|source| {
            CatalogFileError::Encoding {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let catalog = ts::parse_catalog(&text).map_err(|err| CatalogFileError::Format {
            path: path.to_path_buf(),
            source: err.into(),
        })?;
        debug!("loaded {} ({} messages)", path.display(), catalog.len());

        Ok(Self {
            path: path.to_path_buf(),
            catalog,
            metadata,
            existed: true,
        })
    }

    /// Load `path`, or start an empty catalog when it does not exist yet.
    /// The language of a new catalog is `language`, else the file-name suffix.
    pub fn load_or_create(
        path: impl AsRef<Path>,
        language: Option<&str>,
    ) -> Result<Self, CatalogFileError> {
        let path = path.as_ref();
        if path.exists() {
            let mut loaded = Self::load(path)?;
            if let Some(language) = language {
                if loaded.catalog.language().is_empty() {
                    loaded.catalog.header_mut().language = language.to_string();
                }
            }
            return Ok(loaded);
        }

        let language = language
            .map(str::to_string)
            .or_else(|| language_from_file_name(path))
            .ok_or_else(|| CatalogFileError::UnknownLanguage(path.to_path_buf()))?;
        info!("creating new {language} catalog at {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            catalog: Catalog::new(language),
            metadata: FileMetadata::default(),
            existed: false,
        })
    }

    /// Bytes that `save` would write.
    pub fn render(&self, catalog: &Catalog, preserve_encoding: bool) -> Vec<u8> {
        let text = ts::emit_catalog(catalog);
        if preserve_encoding {
            self.metadata.encode(&text)
        } else {
            text.into_bytes()
        }
    }

    /// Replace the file with `catalog`, restoring this file's BOM and newlines.
    pub fn save(
        &self,
        catalog: &Catalog,
        preserve_encoding: bool,
        keep_backup: bool,
    ) -> Result<BackupOutcome, CatalogFileError> {
        let bytes = self.render(catalog, preserve_encoding);
        let outcome = backup_and_swap(&self.path, &bytes, keep_backup)?;
        debug!("wrote {} ({} bytes)", self.path.display(), bytes.len());
        Ok(outcome)
    }
}

/// Read extractor output; `.jsonl`/`.ndjson` is line-delimited, else a JSON array.
pub fn read_extraction(path: impl AsRef<Path>) -> Result<Vec<ExtractedMessage>, CatalogFileError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| CatalogFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_extraction(&content, FileFormat::from_path(path)).map_err(|source| {
        CatalogFileError::Format {
            path: path.to_path_buf(),
            source,
        }
    })
}

pub fn language_from_file_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    LANGUAGE_SUFFIX_REGEX
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
