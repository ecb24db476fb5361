use crate::error::Result;
use bytes::Bytes;
use rand::seq::SliceRandom;
use reqwest::{Client, Response};
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA, USER_AGENT,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Timeout applied to page fetches unless overridden.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Sitemaps can be large, so they get a longer budget than pages.
pub const DEFAULT_SITEMAP_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Why a fetch did not produce a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Timeout,
    Connect,
    Status(u16),
    Body,
    Request,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Connect => write!(f, "connection failed"),
            FailureKind::Status(code) => write!(f, "HTTP {}", code),
            FailureKind::Body => write!(f, "body read failed"),
            FailureKind::Request => write!(f, "request failed"),
        }
    }
}

/// A fetch that did not produce a body. Carries the URL so a failure can be
/// reported on its own, away from the batch it came from.
#[derive(Error, Debug, Clone)]
#[error("{url}: {kind} ({message})")]
pub struct FetchFailure {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(url: &str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            kind,
            message: message.into(),
        }
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() {
            FailureKind::Connect
        } else if err.is_body() || err.is_decode() {
            FailureKind::Body
        } else if let Some(status) = err.status() {
            FailureKind::Status(status.as_u16())
        } else {
            FailureKind::Request
        };
        Self::new(url, kind, err.to_string())
    }
}

/// Either the response body or the reason there is none.
pub type FetchResult = std::result::Result<Bytes, FetchFailure>;

/// Single-GET HTTP fetcher with browser-like headers.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    user_agents: Arc<Vec<String>>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            timeout: DEFAULT_PAGE_TIMEOUT,
            user_agents: Arc::new(DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the User-Agent pool. An empty pool keeps the current one.
    pub fn with_user_agents(mut self, user_agents: Vec<String>) -> Self {
        if !user_agents.is_empty() {
            self.user_agents = Arc::new(user_agents);
        }
        self
    }

    pub async fn fetch_with_timeout(&self, url: &str, timeout: Duration) -> FetchResult {
        self.send(url, timeout)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchFailure::from_reqwest(url, e))
    }

    /// Fetch a page as text, decoded with the charset its `Content-Type`
    /// declares and UTF-8 otherwise.
    pub async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        self.send(url, self.timeout)
            .await?
            .text()
            .await
            .map_err(|e| FetchFailure::from_reqwest(url, e))
    }

    async fn send(&self, url: &str, timeout: Duration) -> std::result::Result<Response, FetchFailure> {
        let parsed = Url::parse(url)
            .map_err(|e| FetchFailure::new(url, FailureKind::InvalidUrl, e.to_string()))?;

        debug!("Fetching {}", url);
        let response = self
            .client
            .get(parsed)
            .headers(self.request_headers())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::new(
                url,
                FailureKind::Status(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(response)
    }

    /// Header set for one request, with a freshly picked User-Agent.
    pub fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(agent) = self.user_agents.choose(&mut rand::thread_rng())
            && let Ok(value) = HeaderValue::from_str(agent)
        {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers
    }
}
