//! Delimited text extraction from fetched page content.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static TITLE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<title[^>]*>").expect("title start regex is valid")); // Static pattern, safe to panic

#[allow(clippy::expect_used)]
static TITLE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</title\s*>").expect("title end regex is valid")); // Static pattern, safe to panic

/// Returns the text strictly between the first `start` match and the first
/// `end` match at or after it.
///
/// A miss on either pattern yields `None`; callers are expected to treat that
/// as an ordinary outcome rather than a failure.
///
/// # Examples
///
/// ```
/// use regex::Regex;
/// use partlist_core::fetch::scrape_text;
///
/// let start = Regex::new("<title>").unwrap();
/// let end = Regex::new("</title>").unwrap();
/// assert_eq!(
///     scrape_text("<title>Widget</title>", &start, &end),
///     Some("Widget".to_string())
/// );
/// ```
#[must_use]
pub fn scrape_text(content: &str, start: &Regex, end: &Regex) -> Option<String> {
    let start_match = start.find(content)?;
    let end_match = end.find_at(content, start_match.end())?;
    Some(content[start_match.end()..end_match.start()].to_string())
}

/// Extracts the trimmed `<title>` text of an HTML page, if any.
#[must_use]
pub fn scrape_title(content: &str) -> Option<String> {
    scrape_text(content, &TITLE_START, &TITLE_END)
        .map(|title| title.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|title| !title.is_empty())
}
