use crate::fetcher::HttpFetcher;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// On-page metadata for one URL. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    pub title: String,
    pub description: String,
    pub h1: String,
    /// Why the page could not be fetched, if it could not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageMetadata {
    pub fn new(url: String) -> Self {
        Self {
            url,
            ..Default::default()
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            url,
            error: Some(error),
            ..Default::default()
        }
    }

    /// True when no field could be extracted.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.h1.is_empty()
    }
}

/// Parse `html` and pull out title, meta description and first `<h1>`.
///
/// html5ever recovers from any malformed input, so this cannot fail;
/// absent elements leave the field empty.
pub fn extract_from_html(url: &str, html: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    let mut metadata = PageMetadata::new(url.to_string());

    let title_selector = Selector::parse("title").unwrap();
    if let Some(title) = document.select(&title_selector).next() {
        metadata.title = title.text().collect::<String>().trim().to_string();
    }

    let meta_selector = Selector::parse("meta[name]").unwrap();
    let description = document.select(&meta_selector).find(|element| {
        element
            .value()
            .attr("name")
            .is_some_and(|name| name.trim().eq_ignore_ascii_case("description"))
    });
    if let Some(content) = description.and_then(|element| element.value().attr("content")) {
        metadata.description = content.trim().to_string();
    }

    let h1_selector = Selector::parse("h1").unwrap();
    if let Some(h1) = document.select(&h1_selector).next() {
        metadata.h1 = h1.text().collect::<String>().trim().to_string();
    }

    metadata
}

/// Fetches a page and extracts its metadata.
#[derive(Clone)]
pub struct MetadataExtractor {
    fetcher: HttpFetcher,
}

impl MetadataExtractor {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// Never fails: an unreachable page yields empty metadata with the
    /// failure recorded in `error`.
    pub async fn extract(&self, url: &str) -> PageMetadata {
        match self.fetcher.fetch_text(url).await {
            Ok(html) => extract_from_html(url, &html),
            Err(failure) => {
                debug!("No metadata for {}: {}", url, failure);
                PageMetadata::with_error(url.to_string(), failure.to_string())
            }
        }
    }
}
