//! Storage types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::ExtractorError;

/// Longest accepted document name in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Document store errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Document {name} could not be read: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: ExtractorError,
    },

    #[error("Storage I/O error for {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(name: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            name: name.into(),
            source,
        }
    }
}

/// Sanitized document name
///
/// A single path component: never empty, no separators, no `..`, no leading
/// dot, no control characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentName(String);

impl DocumentName {
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let invalid = |reason| StorageError::InvalidName {
            name: raw.to_string(),
            reason,
        };

        let name = raw.trim();
        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid("name is too long"));
        }
        if name.starts_with('.') {
            return Err(invalid("name starts with a dot"));
        }
        if name.contains(['/', '\\']) {
            return Err(invalid("name contains a path separator"));
        }
        if name.chars().any(char::is_control) {
            return Err(invalid("name contains control characters"));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the per-document cache directory: the name without its final
    /// extension (`report.pdf` -> `report`).
    ///
    /// Names differing only in extension share one cache directory.
    pub fn cache_key(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.0,
        }
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentName> for String {
    fn from(name: DocumentName) -> Self {
        name.0
    }
}

/// Listing entry for an uploaded document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Result of storing an upload
#[derive(Debug, Clone, Serialize)]
pub struct StoredDocument {
    pub name: String,
    pub size: u64,
    pub sha256: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_name_accepts_plain_names() {
        let name = DocumentName::parse("Annual Report 2023.pdf").unwrap();
        assert_eq!(name.as_str(), "Annual Report 2023.pdf");
        assert_eq!(name.cache_key(), "Annual Report 2023");
    }

    #[test]
    fn test_document_name_rejects_traversal() {
        for raw in ["../etc/passwd", "a/b.pdf", "a\\b.pdf", "..", ".hidden", "", "   ", "a\nb"] {
            assert!(
                matches!(DocumentName::parse(raw), Err(StorageError::InvalidName { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_document_name_length_limit() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(DocumentName::parse(&long).is_err());
        assert!(DocumentName::parse(&"a".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_cache_key_strips_last_extension_only() {
        assert_eq!(DocumentName::parse("book.tar.gz").unwrap().cache_key(), "book.tar");
        assert_eq!(DocumentName::parse("notes").unwrap().cache_key(), "notes");
        assert_eq!(DocumentName::parse("draft.").unwrap().cache_key(), "draft");
    }
}
