//! Error types for part creation and refresh.

use thiserror::Error;

use crate::fetch::FetchError;

/// Errors raised while creating a part or recorded when refreshing one.
///
/// A part keeps the last refresh failure (see
/// [`Part::refresh_error`](super::Part::refresh_error)); the BOM only checks
/// whether one is present.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartError {
    /// The part URL could not be parsed.
    #[error("invalid part URL '{url}'\n  Suggestion: Use an absolute http(s) URL")]
    InvalidUrl {
        /// The rejected input.
        url: String,
    },

    /// No registered adapter accepts the URL.
    #[error("no part adapter handles '{url}'\n  Suggestion: Register an adapter for this site")]
    NoAdapter {
        /// The canonical URL nobody claimed.
        url: String,
    },

    /// Page content for the part could not be fetched.
    #[error("fetching part page failed: {0}")]
    Fetch(#[from] FetchError),

    /// The page was fetched but the part could not be built from it.
    #[error("refreshing part '{url}' failed: {reason}")]
    RefreshFailed {
        /// The part URL.
        url: String,
        /// Why the refresh failed.
        reason: String,
    },
}

impl PartError {
    /// Creates an `InvalidUrl` error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a `NoAdapter` error.
    pub fn no_adapter(url: impl Into<String>) -> Self {
        Self::NoAdapter { url: url.into() }
    }

    /// Creates a `RefreshFailed` error.
    pub fn refresh_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RefreshFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
