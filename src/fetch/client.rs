//! Cache-first HTTP page fetcher.
//!
//! [`CachingFetcher::get`] consults the shared [`ContentCache`] before touching
//! the network, follows a bounded number of redirects itself, and records both
//! page text and failures against the URL that was asked for.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, LOCATION, USER_AGENT};
use reqwest::{Client, ClientBuilder, StatusCode, redirect};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::cache::{CachedOutcome, ContentCache};
use super::config::{FetcherConfig, MAX_REDIRECTS};
use super::error::FetchError;

/// Cache-first page fetcher.
///
/// Create one per header profile and share it behind an `Arc`; the request
/// counters and the content cache are safe to use from many tasks at once.
///
/// # Example
///
/// ```no_run
/// use partlist_core::fetch::{CachingFetcher, ContentCache, FetcherConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = CachingFetcher::new(FetcherConfig::for_locale("en_US"), ContentCache::new())?;
/// let page = fetcher.get("https://example.com/part/123").await?;
/// println!("{} bytes, {} network requests", page.len(), fetcher.network_requests());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CachingFetcher {
    client: Client,
    config: FetcherConfig,
    cache: ContentCache,
    url_requests: AtomicU64,
    network_requests: AtomicU64,
}

impl CachingFetcher {
    /// Creates a fetcher with the given profile, backed by `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(config: FetcherConfig, cache: ContentCache) -> Result<Self, FetchError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate verification disabled for this fetcher");
        }
        let client = build_client(&config)?;
        Ok(Self {
            client,
            config,
            cache,
            url_requests: AtomicU64::new(0),
            network_requests: AtomicU64::new(0),
        })
    }

    /// Returns the profile this fetcher sends.
    #[must_use]
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Returns the backing content cache.
    #[must_use]
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Number of [`get`](Self::get) calls made so far.
    #[must_use]
    pub fn url_requests(&self) -> u64 {
        self.url_requests.load(Ordering::SeqCst)
    }

    /// Number of `get` calls that went to the network (cache misses).
    #[must_use]
    pub fn network_requests(&self) -> u64 {
        self.network_requests.load(Ordering::SeqCst)
    }

    /// Returns the text content of `url`, from cache when possible.
    ///
    /// A cached failure is returned again without a network request. A fresh
    /// failure is cached under `url` before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the URL is invalid, the request fails or
    /// times out, the server answers with a non-success status, more than
    /// [`MAX_REDIRECTS`] redirects are chained, or the body cannot be read.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        self.url_requests.fetch_add(1, Ordering::SeqCst);

        if self.config.caching
            && let Some(outcome) = self.cache.get(url)
        {
            return match outcome {
                CachedOutcome::Content(text) => {
                    debug!(bytes = text.len(), "serving cached content");
                    Ok(text)
                }
                CachedOutcome::Failure(error) => {
                    debug!(error = %error, "replaying cached failure");
                    Err(error)
                }
            };
        }

        self.network_requests.fetch_add(1, Ordering::SeqCst);
        let result = self.fetch_following_redirects(url).await;

        match &result {
            Ok(text) => info!(bytes = text.len(), "fetched content"),
            Err(error) => warn!(error = %error, "fetch failed"),
        }
        if self.config.caching {
            let outcome = match &result {
                Ok(text) => CachedOutcome::Content(text.clone()),
                Err(error) => CachedOutcome::Failure(error.clone()),
            };
            self.cache.put(url, outcome);
        }
        result
    }

    async fn fetch_following_redirects(&self, url: &str) -> Result<String, FetchError> {
        let mut current = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        let mut redirects: usize = 0;

        loop {
            let response = self.send(&current).await?;
            let status = response.status();

            if is_followed_redirect(status) {
                if redirects >= MAX_REDIRECTS {
                    return Err(FetchError::too_many_redirects(url, redirects + 1));
                }
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| FetchError::missing_location(current.as_str(), status.as_u16()))?;
                let next = current
                    .join(location)
                    .map_err(|_| FetchError::invalid_url(location))?;
                redirects += 1;
                debug!(from = %current, to = %next, redirects, "following redirect");
                current = next;
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::http_status(current.as_str(), status.as_u16()));
            }

            return response
                .text()
                .await
                .map_err(|error| FetchError::body(current.as_str(), &error));
        }
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response, FetchError> {
        let mut request = self.client.get(url.clone());
        if let Some(accept) = &self.config.accept {
            request = request.header(ACCEPT, accept);
        }
        if let Some(language) = &self.config.language {
            request = request.header(ACCEPT_LANGUAGE, language);
        }
        if let Some(user_agent) = &self.config.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }
        if let Some(cookies) = &self.config.cookies {
            request = request.header(COOKIE, cookies);
        }
        if let Some(auth) = &self.config.basic_auth {
            request = request.basic_auth(&auth.user, Some(&auth.password));
        }

        request
            .send()
            .await
            .map_err(|error| FetchError::from_send(url.as_str(), &error))
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn build_client(config: &FetcherConfig) -> Result<Client, FetchError> {
    match try_build_client(config, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic while reading system proxy
            // settings; retry without the system lookup.
            warn!("HTTP client builder panicked while loading system proxy settings; retrying without proxy lookup");
            match try_build_client(config, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(FetchError::ClientBuild {
                    reason: "client builder panicked".to_string(),
                }),
                Err(BuildClientFailure::Build(error)) => Err(FetchError::ClientBuild {
                    reason: error.to_string(),
                }),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(FetchError::ClientBuild {
            reason: error.to_string(),
        }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    config: &FetcherConfig,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let config = config.clone();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(&config);
        if disable_system_proxy_lookup {
            builder = builder.no_proxy();
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(config: &FetcherConfig) -> ClientBuilder {
    Client::builder()
        .redirect(redirect::Policy::none())
        .connect_timeout(config.connect_timeout)
        .timeout(config.read_timeout)
        .gzip(true)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
}
