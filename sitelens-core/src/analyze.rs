use sitelens_scanner::fetcher::DEFAULT_SITEMAP_TIMEOUT;
use sitelens_scanner::{HttpFetcher, SitemapDocument, SitemapKind, parse_sitemap, top_level_directory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// URL counts for one leaf sitemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapSummary {
    pub sitemap_url: String,
    pub url_count: usize,
    pub directory_histogram: BTreeMap<String, usize>,
    pub urls: Vec<String>,
    /// Set when the sitemap could not be fetched or parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The sitemap was fetched but is not well-formed XML
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub malformed: bool,
}

impl SitemapSummary {
    pub fn from_urls(sitemap_url: String, urls: Vec<String>) -> Self {
        let mut directory_histogram = BTreeMap::new();
        for url in &urls {
            *directory_histogram.entry(top_level_directory(url)).or_insert(0) += 1;
        }

        Self {
            sitemap_url,
            url_count: urls.len(),
            directory_histogram,
            urls,
            error: None,
            malformed: false,
        }
    }

    /// Zero-URL summary standing in for a sitemap that failed.
    pub fn empty(sitemap_url: String, error: String) -> Self {
        Self {
            sitemap_url,
            url_count: 0,
            directory_histogram: BTreeMap::new(),
            urls: Vec::new(),
            error: Some(error),
            malformed: false,
        }
    }

    /// Zero-URL summary for a sitemap whose XML could not be parsed.
    pub fn malformed(sitemap_url: String, error: String) -> Self {
        Self {
            malformed: true,
            ..Self::empty(sitemap_url, error)
        }
    }

    /// Directory labels in the order their first URL appears.
    pub fn directories_in_order(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for url in &self.urls {
            let label = top_level_directory(url);
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }
}

/// Summarise an already-parsed document as a leaf sitemap.
pub fn summarize(sitemap_url: &str, document: SitemapDocument) -> SitemapSummary {
    match document.kind {
        SitemapKind::UrlSet => SitemapSummary::from_urls(sitemap_url.to_string(), document.locs),
        SitemapKind::Index => SitemapSummary::empty(
            sitemap_url.to_string(),
            "document is a sitemap index, not a URL set".to_string(),
        ),
        SitemapKind::Unknown => {
            SitemapSummary::empty(sitemap_url.to_string(), "unknown sitemap format".to_string())
        }
    }
}

/// Fetches and summarises leaf sitemaps, one at a time.
pub struct SitemapAnalyzer {
    fetcher: HttpFetcher,
    timeout: Duration,
}

impl SitemapAnalyzer {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            timeout: DEFAULT_SITEMAP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Never fails; see [`SitemapSummary::empty`].
    pub async fn analyze(&self, sitemap_url: &str) -> SitemapSummary {
        debug!("Analyzing sitemap {}", sitemap_url);

        let body = match self.fetcher.fetch_with_timeout(sitemap_url, self.timeout).await {
            Ok(body) => body,
            Err(failure) => {
                warn!("Could not fetch sitemap {}", failure);
                return SitemapSummary::empty(sitemap_url.to_string(), failure.to_string());
            }
        };

        match parse_sitemap(&body) {
            Ok(document) => summarize(sitemap_url, document),
            Err(e) => {
                warn!("Could not parse sitemap {}: {}", sitemap_url, e);
                SitemapSummary::malformed(sitemap_url.to_string(), e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_urls_counts_directories() {
        let urls = vec![
            "https://x.com/".to_string(),
            "https://x.com/about".to_string(),
            "https://x.com/blog/one".to_string(),
            "https://x.com/blog/two".to_string(),
            "https://x.com/docs/intro".to_string(),
        ];
        let summary = SitemapSummary::from_urls("https://x.com/sitemap.xml".to_string(), urls);

        assert_eq!(summary.url_count, 5);
        assert_eq!(summary.urls.len(), 5);
        assert_eq!(summary.directory_histogram["Homepage"], 1);
        assert_eq!(summary.directory_histogram["Others"], 1);
        assert_eq!(summary.directory_histogram["blog"], 2);
        assert_eq!(summary.directory_histogram["docs"], 1);
        assert_eq!(summary.directory_histogram.values().sum::<usize>(), 5);
        assert_eq!(
            summary.directories_in_order(),
            vec!["Homepage", "Others", "blog", "docs"]
        );
    }

    #[test]
    fn test_summarize_index_is_empty() {
        let document = SitemapDocument {
            kind: SitemapKind::Index,
            locs: vec!["https://x.com/sitemap-1.xml".to_string()],
        };
        let summary = summarize("https://x.com/sitemap.xml", document);
        assert_eq!(summary.url_count, 0);
        assert!(summary.urls.is_empty());
        assert!(summary.error.is_some());
    }

    #[test]
    fn test_empty_summary() {
        let summary = SitemapSummary::empty("https://x.com/s.xml".to_string(), "boom".to_string());
        assert_eq!(summary.url_count, 0);
        assert!(summary.directory_histogram.is_empty());
        assert_eq!(summary.error.as_deref(), Some("boom"));
        assert!(!summary.malformed);
    }

    #[test]
    fn test_malformed_summary_is_flagged() {
        let summary = SitemapSummary::malformed("https://x.com/s.xml".to_string(), "bad xml".to_string());
        assert!(summary.malformed);
        assert_eq!(summary.url_count, 0);
        assert_eq!(summary.error.as_deref(), Some("bad xml"));
    }
}
