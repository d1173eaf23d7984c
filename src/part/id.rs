//! Part identity derived from canonical URLs.

use std::fmt;

use serde::Serialize;
use url::Url;

use super::PartError;

/// Stable, totally ordered identity of a part.
///
/// Two URLs that canonicalize to the same text name the same physical part.
/// Canonical form is the `url` crate's serialization (lower-case scheme and
/// host, default port dropped, dot segments resolved) without the fragment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PartId(String);

impl PartId {
    /// Canonicalizes `url` into a part identity.
    ///
    /// # Errors
    ///
    /// Returns [`PartError::InvalidUrl`] if `url` is not an absolute URL.
    pub fn from_url(url: &str) -> Result<Self, PartError> {
        canonical_url(url).map(|parsed| Self(parsed.into()))
    }

    /// Returns the canonical URL text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parses and canonicalizes a part URL.
///
/// # Errors
///
/// Returns [`PartError::InvalidUrl`] if `url` is not an absolute URL.
pub fn canonical_url(url: &str) -> Result<Url, PartError> {
    let mut parsed = Url::parse(url.trim()).map_err(|_| PartError::invalid_url(url))?;
    parsed.set_fragment(None);
    Ok(parsed)
}
