use std::fmt;

use thiserror::Error;

/// Failure of a page-level operation on the rendering session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for SourceError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceErrorKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    InvalidSelector,
    NoDocument,
    Browser,
    Network,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceErrorKind::InvalidUrl => write!(f, "invalid url"),
            SourceErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            SourceErrorKind::Timeout => write!(f, "timeout"),
            SourceErrorKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            SourceErrorKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            SourceErrorKind::InvalidSelector => write!(f, "invalid selector"),
            SourceErrorKind::NoDocument => write!(f, "no document loaded"),
            SourceErrorKind::Browser => write!(f, "browser error"),
            SourceErrorKind::Network => write!(f, "network error"),
        }
    }
}

/// Why a card-scoped probe produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeMiss {
    #[error("locator matched nothing")]
    NotFound,
    #[error("card is no longer attached to the page")]
    Detached,
    #[error("probe unavailable: {0}")]
    Unavailable(String),
}

impl From<SourceError> for ProbeMiss {
    fn from(err: SourceError) -> Self {
        ProbeMiss::Unavailable(err.to_string())
    }
}
