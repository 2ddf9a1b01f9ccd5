//! Error types for module graph resolution.

use thiserror::Error;
use url::Url;

/// A module source could not be scanned for imports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScanError {
    /// Line where the offending token starts (1-indexed).
    pub line: u32,
    pub message: String,
}

impl ScanError {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Why a module graph could not be built.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("failed to read module {url}: {source}")]
    Read {
        url: Url,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan module {url}: {source}")]
    Scan {
        url: Url,
        #[source]
        source: ScanError,
    },

    #[error("cannot resolve bare specifier \"{specifier}\" imported from {referrer}")]
    UnsupportedSpecifier { specifier: String, referrer: Url },

    #[error("invalid specifier \"{specifier}\" imported from {referrer}: {source}")]
    InvalidSpecifier {
        specifier: String,
        referrer: Url,
        #[source]
        source: url::ParseError,
    },

    #[error("module {url} is outside the static root")]
    OutsideRoot { url: Url },

    #[error("module {url} does not map to a local file")]
    NotAFile { url: Url },
}

pub type GraphResult<T> = Result<T, GraphError>;
