//! Error taxonomy shared by the fetch, cache and allocation layers.

use thiserror::Error;

/// Failures surfaced by the library.
///
/// The type is `Clone` because a single settled load is handed to every caller
/// waiting on the same cache key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Network or status failure. `transient` is set when the retry budget
    /// ran out on 429/5xx/network errors and clear when the source refused
    /// the request outright.
    #[error("failed to fetch {resource}: {cause}")]
    Fetch {
        resource: String,
        cause: String,
        transient: bool,
    },

    /// The document did not have the expected structure.
    #[error("unexpected document structure: {0}")]
    Parse(String),

    /// Caller-supplied weights or counts violate an allocation invariant.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn fetch(resource: impl Into<String>, cause: impl ToString) -> Self {
        Error::Fetch {
            resource: resource.into(),
            cause: cause.to_string(),
            transient: true,
        }
    }

    /// A fetch failure that another attempt would not fix, such as a 404.
    pub fn rejected(resource: impl Into<String>, cause: impl ToString) -> Self {
        Error::Fetch {
            resource: resource.into(),
            cause: cause.to_string(),
            transient: false,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Whether running the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Fetch { transient: true, .. })
    }
}
