use sitelens_scanner::fetcher::DEFAULT_SITEMAP_TIMEOUT;
use sitelens_scanner::{HttpFetcher, SitemapKind, parse_sitemap};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Leaf sitemaps found behind a set of sitemap indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Leaf sitemap URLs left after exclusion, in discovery order
    pub sitemaps: Vec<String>,
    /// Count before the exclusion filter ran
    pub discovered: usize,
    pub excluded: usize,
    /// One line per index that could not be fetched or had an unknown root
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// One line per index whose XML is malformed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Drop every URL containing `exclude`, ignoring case. Returns the kept
/// URLs and how many were dropped. An empty filter keeps everything.
pub fn apply_exclusion(sitemaps: Vec<String>, exclude: Option<&str>) -> (Vec<String>, usize) {
    let Some(filter) = exclude.map(str::to_lowercase).filter(|f| !f.is_empty()) else {
        return (sitemaps, 0);
    };

    let before = sitemaps.len();
    let kept: Vec<String> = sitemaps
        .into_iter()
        .filter(|s| !s.to_lowercase().contains(&filter))
        .collect();
    let excluded = before - kept.len();
    (kept, excluded)
}

/// Expands sitemap indexes into the leaf sitemaps they reference.
///
/// The protocol allows a single level of indirection, so each input is
/// fetched once. A URL set given as input is already a leaf and resolves
/// to itself.
pub struct SitemapResolver {
    fetcher: HttpFetcher,
    timeout: Duration,
}

impl SitemapResolver {
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

    pub async fn resolve(&self, index_urls: &[String], exclude: Option<&str>) -> Resolution {
        let mut sitemaps = Vec::new();
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        for index_url in index_urls {
            let body = match self.fetcher.fetch_with_timeout(index_url, self.timeout).await {
                Ok(body) => body,
                Err(failure) => {
                    warn!("Could not fetch sitemap index {}", failure);
                    warnings.push(format!("Could not fetch sitemap index {}", failure));
                    continue;
                }
            };

            match parse_sitemap(&body) {
                Ok(document) => match document.kind {
                    SitemapKind::Index => sitemaps.extend(document.locs),
                    SitemapKind::UrlSet => sitemaps.push(index_url.clone()),
                    SitemapKind::Unknown => {
                        warn!("Unknown sitemap format at {}", index_url);
                        warnings.push(format!("Unknown sitemap format at {}", index_url));
                    }
                },
                Err(e) => {
                    warn!("Could not parse sitemap index {}: {}", index_url, e);
                    errors.push(format!("Sitemap index {} is not valid XML: {}", index_url, e));
                }
            }
        }

        let discovered = sitemaps.len();
        let (sitemaps, excluded) = apply_exclusion(sitemaps, exclude);
        info!(
            "Resolved {} sitemaps from {} index(es), {} excluded",
            discovered,
            index_urls.len(),
            excluded
        );

        Resolution {
            sitemaps,
            discovered,
            excluded,
            warnings,
            errors,
        }
    }
}
