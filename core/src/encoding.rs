/// Encoding, BOM and newline preservation for catalog files
use thiserror::Error;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Catalog is not valid UTF-16: {0}")]
    InvalidUtf16(String),

    #[error("Catalog is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    #[default]
    Lf,
    Crlf,
}

/// Byte-level layout of a catalog file, restored when the file is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileMetadata {
    pub encoding: Encoding,
    pub newline: Newline,
    /// Always set for UTF-16, which is only recognised by its BOM
    pub has_bom: bool,
}

impl FileMetadata {
    pub fn detect(content: &[u8]) -> Self {
        let (encoding, has_bom) = detect_encoding(content);
        let newline = match encoding {
            Encoding::Utf8 => detect_newline(content),
            Encoding::Utf16Le => detect_utf16_newline(&content[2..], [b'\r', 0, b'\n', 0]),
            Encoding::Utf16Be => detect_utf16_newline(&content[2..], [0, b'\r', 0, b'\n']),
        };
        Self {
            encoding,
            newline,
            has_bom,
        }
    }

    /// Decode file bytes into LF-normalised text.
    pub fn decode(bytes: &[u8]) -> Result<(String, FileMetadata), EncodingError> {
        let metadata = Self::detect(bytes);
        let text = match metadata.encoding {
            Encoding::Utf8 => {
                let body = if metadata.has_bom { &bytes[UTF8_BOM.len()..] } else { bytes };
                String::from_utf8(body.to_vec())?
            }
            Encoding::Utf16Le => decode_utf16(&bytes[2..], u16::from_le_bytes)?,
            Encoding::Utf16Be => decode_utf16(&bytes[2..], u16::from_be_bytes)?,
        };
        Ok((normalize_newlines(&text, Newline::Lf), metadata))
    }

    /// Encode LF text back into this layout.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let text = normalize_newlines(text, self.newline);
        match self.encoding {
            Encoding::Utf8 => {
                let mut bytes = Vec::with_capacity(text.len() + UTF8_BOM.len());
                if self.has_bom {
                    bytes.extend_from_slice(&UTF8_BOM);
                }
                bytes.extend_from_slice(text.as_bytes());
                bytes
            }
            Encoding::Utf16Le => {
                let mut bytes = UTF16_LE_BOM.to_vec();
                for unit in text.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_le_bytes());
                }
                bytes
            }
            Encoding::Utf16Be => {
                let mut bytes = UTF16_BE_BOM.to_vec();
                for unit in text.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_be_bytes());
                }
                bytes
            }
        }
    }
}

fn detect_encoding(content: &[u8]) -> (Encoding, bool) {
    if content.starts_with(&UTF8_BOM) {
        return (Encoding::Utf8, true);
    }
    if content.starts_with(&UTF16_LE_BOM) {
        return (Encoding::Utf16Le, true);
    }
    if content.starts_with(&UTF16_BE_BOM) {
        return (Encoding::Utf16Be, true);
    }
    (Encoding::Utf8, false)
}

fn detect_newline(content: &[u8]) -> Newline {
    if content.windows(2).any(|window| window == b"\r\n") {
        Newline::Crlf
    } else {
        Newline::Lf
    }
}

// Windows starting at even offsets are aligned to code units
fn detect_utf16_newline(body: &[u8], crlf: [u8; 4]) -> Newline {
    if body.windows(4).step_by(2).any(|window| window == &crlf[..]) {
        Newline::Crlf
    } else {
        Newline::Lf
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, EncodingError> {
    let chunks = body.chunks_exact(2);
    if !chunks.remainder().is_empty() {
        return Err(EncodingError::InvalidUtf16("odd number of bytes".into()));
    }
    let units: Vec<u16> = chunks.map(|chunk| unit([chunk[0], chunk[1]])).collect();
    String::from_utf16(&units).map_err(|err| EncodingError::InvalidUtf16(err.to_string()))
}

pub fn normalize_newlines(text: &str, style: Newline) -> String {
    let normalized = text.replace("\r\n", "\n");
    match style {
        Newline::Lf => normalized,
        Newline::Crlf => normalized.replace('\n', "\r\n"),
    }
}
