//! Request profile and transport options for [`CachingFetcher`](super::CachingFetcher).

use std::fmt;
use std::time::Duration;

use crate::user_agent::{BROWSER_ACCEPT, BROWSER_LANGUAGE, BROWSER_USER_AGENT, is_us_english};

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout (30 seconds).
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Maximum number of redirects followed for one fetch.
pub const MAX_REDIRECTS: usize = 5;

/// Basic-auth credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Headers, caching and TLS options for a fetcher.
///
/// Setters consume and return the config so they chain:
///
/// ```
/// use partlist_core::fetch::FetcherConfig;
///
/// let config = FetcherConfig::for_locale("en_US.UTF-8")
///     .cookies("session=abc")
///     .basic_auth("maker", "s3cret")
///     .caching(false);
/// assert!(config.user_agent.is_some());
/// assert!(!config.caching);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// `Accept` header value.
    pub accept: Option<String>,
    /// `Accept-Language` header value.
    pub language: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: Option<String>,
    /// Raw `Cookie` header value.
    pub cookies: Option<String>,
    /// Basic-auth credentials.
    pub basic_auth: Option<BasicAuth>,
    /// Whether cached outcomes are consulted and recorded.
    pub caching: bool,
    /// Accept any server certificate. Disables TLS verification; only for
    /// vendor sites with self-signed or broken certificates.
    pub accept_invalid_certs: bool,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout, including reading the body.
    pub read_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            accept: None,
            language: None,
            user_agent: None,
            cookies: None,
            basic_auth: None,
            caching: true,
            accept_invalid_certs: false,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
        }
    }
}

impl FetcherConfig {
    /// Creates a config for `locale`.
    ///
    /// US English gets the browser-like header profile; any other locale
    /// leaves `Accept`, `Accept-Language` and `User-Agent` unset.
    #[must_use]
    pub fn for_locale(locale: &str) -> Self {
        let config = Self::default();
        if is_us_english(locale) {
            config
                .accept(BROWSER_ACCEPT)
                .language(BROWSER_LANGUAGE)
                .user_agent(BROWSER_USER_AGENT)
        } else {
            config
        }
    }

    /// Creates a config for the process locale (`LC_ALL`, `LC_MESSAGES`, then `LANG`).
    #[must_use]
    pub fn from_env() -> Self {
        Self::for_locale(&process_locale())
    }

    /// Sets the `Accept` header.
    #[must_use]
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Sets the `Accept-Language` header.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the raw `Cookie` header.
    #[must_use]
    pub fn cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    /// Sets basic-auth credentials.
    #[must_use]
    pub fn basic_auth(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            user: user.into(),
            password: password.into(),
        });
        self
    }

    /// Enables or disables the content cache.
    #[must_use]
    pub fn caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    /// Enables or disables acceptance of invalid TLS certificates.
    #[must_use]
    pub fn accept_invalid_certs(mut self, accept_invalid_certs: bool) -> Self {
        self.accept_invalid_certs = accept_invalid_certs;
        self
    }

    /// Sets connect and whole-request timeouts.
    #[must_use]
    pub fn timeouts(mut self, connect_timeout: Duration, read_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }
}

fn process_locale() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|name| {
            std::env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .unwrap_or_default()
}
