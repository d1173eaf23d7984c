//! Browser-like request header profile applied to US-English fetchers.
//!
//! Vendor sites frequently serve reduced or blocked pages to clients that do
//! not look like a browser, so the default profile mimics one.

/// `Accept` header sent by the US-English profile.
pub(crate) const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// `Accept-Language` header sent by the US-English profile.
pub(crate) const BROWSER_LANGUAGE: &str = "en-US,en;q=0.8";

/// `User-Agent` header sent by the US-English profile.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; CrOS x86_64 5712.61.0) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/35.0.1916.116 Safari/537.36";

/// Returns true for locale tags naming US English.
///
/// Accepts POSIX (`en_US.UTF-8`, `en_US@euro`) and BCP 47 (`en-US`) spellings.
#[must_use]
pub(crate) fn is_us_english(locale: &str) -> bool {
    let tag = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .replace('-', "_");
    tag.eq_ignore_ascii_case("en_US")
}
