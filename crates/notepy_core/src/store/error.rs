//! Store error taxonomy.
//!
//! Not-found is deliberately absent: lookups return `Option`/`bool` so that
//! absence stays a routine outcome. Everything here is a real failure.

use crate::model::note::FormatError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store operation.
#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing a file failed.
    Storage {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Notes could not be encoded to JSON.
    Encode(serde_json::Error),
    /// A whole input document (not a single entry) is malformed.
    Format { path: PathBuf, message: String },
    /// Import source does not exist.
    ImportFileNotFound(PathBuf),
}

impl StoreError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage { path, source } => {
                write!(f, "storage failure at `{}`: {source}", path.display())
            }
            Self::Encode(err) => write!(f, "failed to encode notes: {err}"),
            Self::Format { path, message } => {
                write!(f, "malformed notes file `{}`: {message}", path.display())
            }
            Self::ImportFileNotFound(path) => {
                write!(f, "import file not found: {}", path.display())
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            Self::Encode(err) => Some(err),
            Self::Format { .. } => None,
            Self::ImportFileNotFound(_) => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Per-entry failure collected while importing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryError {
    /// Key (or position) of the offending entry in the source document.
    pub key: String,
    pub error: FormatError,
}

impl Display for EntryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry `{}`: {}", self.key, self.error)
    }
}
