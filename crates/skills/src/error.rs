//! Error taxonomy for skill-document operations.
//!
//! The variants are part of the public contract: a presentation layer
//! matches on them to render specific, actionable messages.

use std::path::{Path, PathBuf};

/// Errors produced by the codec, schema, registry, and edit session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The marker/header structure of a document could not be parsed.
    /// Non-fatal during a scan (recorded per file), fatal at open-for-edit.
    #[error("malformed skill document {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// A known header field violated its validation rule.
    #[error("invalid field '{field}': {reason}")]
    Validation { field: &'static str, reason: String },

    /// A save or refresh would claim a skill name already held by another file.
    #[error("skill name '{name}' is already taken by {}", existing.display())]
    NameConflict { name: String, existing: PathBuf },

    /// Read, write, or rename failure, with the originating path.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization of an edited header entry failed.
    #[error("header yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The filesystem watcher could not be started.
    #[cfg(feature = "file-watcher")]
    #[error("file watcher: {0}")]
    Watcher(String),
}

impl Error {
    #[must_use]
    pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
