//! Error types for the fetch module.
//!
//! Every variant is `Clone` and carries only owned text so a failure can be
//! stored in the content cache and handed back verbatim on later lookups.

use thiserror::Error;

/// Errors that can occur while fetching page content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The URL (or a redirect `Location`) could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {reason}")]
    Network {
        /// The URL that was requested.
        url: String,
        /// Rendered cause reported by the HTTP client.
        reason: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Server answered with a non-success, non-redirect status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The redirect chain was longer than allowed.
    #[error(
        "too many redirects ({count}) fetching {url}\n  Suggestion: Check for circular redirects or use the final URL directly"
    )]
    TooManyRedirects {
        /// The URL originally requested.
        url: String,
        /// Number of redirects encountered.
        count: usize,
    },

    /// A redirect response had no usable `Location` header.
    #[error("redirect without Location header fetching {url} (HTTP {status})")]
    MissingLocation {
        /// The URL that answered with the redirect.
        url: String,
        /// The redirect status code.
        status: u16,
    },

    /// The response body could not be read as text.
    #[error("failed to read response body from {url}: {reason}")]
    Body {
        /// The URL whose body failed.
        url: String,
        /// Rendered cause reported by the HTTP client.
        reason: String,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Rendered builder error.
        reason: String,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Maps a reqwest send error onto `Timeout` or `Network`.
    pub fn from_send(url: impl Into<String>, error: &reqwest::Error) -> Self {
        let url = url.into();
        if error.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network {
                url,
                reason: error.to_string(),
            }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a redirect-bound error.
    pub fn too_many_redirects(url: impl Into<String>, count: usize) -> Self {
        Self::TooManyRedirects {
            url: url.into(),
            count,
        }
    }

    /// Creates a missing-Location error.
    pub fn missing_location(url: impl Into<String>, status: u16) -> Self {
        Self::MissingLocation {
            url: url.into(),
            status,
        }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, error: &reqwest::Error) -> Self {
        Self::Body {
            url: url.into(),
            reason: error.to_string(),
        }
    }

    /// Returns the URL the failure is about, when there is one.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::InvalidUrl { url }
            | Self::Network { url, .. }
            | Self::Timeout { url }
            | Self::HttpStatus { url, .. }
            | Self::TooManyRedirects { url, .. }
            | Self::MissingLocation { url, .. }
            | Self::Body { url, .. } => Some(url),
            Self::ClientBuild { .. } => None,
        }
    }
}
