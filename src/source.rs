//! Decoding of dictionary source files into text lines.
//!
//! DSL dictionaries are usually stored as UTF-16. A byte order mark, when
//! present, decides the encoding; otherwise the configured label is used.

use encoding_rs::Encoding;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Encoding label used when neither a BOM nor a configured label says otherwise
pub const DEFAULT_ENCODING: &str = "utf-16";

/// Error type for source loading
#[derive(Debug)]
pub enum SourceError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    UnknownEncoding(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io { path, source } => {
                write!(f, "Failed to read source file {}: {}", path.display(), source)
            }
            SourceError::UnknownEncoding(label) => write!(f, "Unknown encoding label: '{}'", label),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::Io { source, .. } => Some(source),
            SourceError::UnknownEncoding(_) => None,
        }
    }
}

/// Decode raw bytes into lines.
///
/// A BOM overrides `encoding_label`. Malformed sequences are replaced with
/// U+FFFD and reported through a warning.
///
/// # Example
/// ```
/// use dsl_normalize::source::decode_lines;
///
/// let lines = decode_lines(b"cat\r\n [trn]chat[/trn]\n", "utf-8").unwrap();
/// assert_eq!(lines, vec!["cat", " [trn]chat[/trn]"]);
/// ```
pub fn decode_lines(bytes: &[u8], encoding_label: &str) -> Result<Vec<String>, SourceError> {
    let fallback = Encoding::for_label(encoding_label.trim().as_bytes())
        .ok_or_else(|| SourceError::UnknownEncoding(encoding_label.to_string()))?;

    let (text, used, had_errors) = fallback.decode(bytes);
    if had_errors {
        tracing::warn!(encoding = used.name(), "source contains malformed sequences");
    }
    tracing::debug!(encoding = used.name(), bytes = bytes.len(), "source decoded");

    Ok(text.lines().map(str::to_string).collect())
}

/// Read and decode a source file
pub fn read_source_lines<P: AsRef<Path>>(
    path: P,
    encoding_label: &str,
) -> Result<Vec<String>, SourceError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    decode_lines(&bytes, encoding_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_decode_utf16_with_bom() {
        let bytes = utf16le_with_bom("#NAME \"Тест\"\r\nкот\r\n [trn]chat[/trn]\r\n");

        let lines = decode_lines(&bytes, DEFAULT_ENCODING).unwrap();
        assert_eq!(lines, vec!["#NAME \"Тест\"", "кот", " [trn]chat[/trn]"]);
    }

    #[test]
    fn test_bom_overrides_label() {
        let bytes = utf16le_with_bom("cat");

        let lines = decode_lines(&bytes, "utf-8").unwrap();
        assert_eq!(lines, vec!["cat"]);
    }

    #[test]
    fn test_decode_without_bom_uses_label() {
        let bytes: Vec<u8> = "cat\n".encode_utf16().flat_map(u16::to_le_bytes).collect();

        let lines = decode_lines(&bytes, "utf-16le").unwrap();
        assert_eq!(lines, vec!["cat"]);
    }

    #[test]
    fn test_unknown_encoding_label() {
        assert!(matches!(
            decode_lines(b"cat", "klingon"),
            Err(SourceError::UnknownEncoding(label)) if label == "klingon"
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_source_lines("/nonexistent/dictionary.dsl", DEFAULT_ENCODING).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dictionary.dsl"));
    }
}
