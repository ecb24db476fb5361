use crate::analyze::{SitemapAnalyzer, SitemapSummary};
use crate::error::{CoreError, Result};
use crate::report::{ReportRow, build_report_rows};
use crate::resolve::{Resolution, SitemapResolver};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use sitelens_scanner::fetcher::{DEFAULT_PAGE_TIMEOUT, DEFAULT_SITEMAP_TIMEOUT};
use sitelens_scanner::pool::DEFAULT_WORKERS;
use sitelens_scanner::{HttpFetcher, MetadataExtractor, MetadataFetcher, ProgressCallback};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::info;

/// What the user-supplied URLs point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMode {
    /// Sitemap indexes, resolved into leaf sitemaps first
    Index,
    /// Leaf sitemaps, analyzed directly
    Sitemaps,
}

/// Options for configuring an analysis run
pub struct AnalysisOptions {
    pub mode: AnalysisMode,
    pub inputs: Vec<String>,
    /// Only applied in index mode
    pub exclude: Option<String>,
    pub workers: usize,
    pub page_timeout: Duration,
    pub sitemap_timeout: Duration,
    pub show_progress_bars: bool,
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl AnalysisOptions {
    pub fn new(mode: AnalysisMode, inputs: Vec<String>) -> Self {
        Self {
            mode,
            inputs,
            exclude: None,
            workers: DEFAULT_WORKERS,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            sitemap_timeout: DEFAULT_SITEMAP_TIMEOUT,
            show_progress_bars: false,
            cancel_flag: None,
        }
    }
}

/// Callback for user-facing status lines
pub type StatusCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub mode: AnalysisMode,
    pub inputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    pub summaries: Vec<SitemapSummary>,
    pub rows: Vec<ReportRow>,
    /// Every warning of the run, the resolver's included
    pub warnings: Vec<String>,
    /// Sitemaps and indexes whose XML is malformed
    pub errors: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Trim every line and drop the blank ones.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn progress_bar(len: usize, template: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .unwrap()
            .progress_chars("=>-"),
    );
    pb
}

fn status(callback: &Option<StatusCallback>, message: String) {
    if let Some(callback) = callback {
        callback(message);
    }
}

/// Run the whole pipeline: resolve, analyze each sitemap, fetch page
/// metadata and join it all into report rows.
///
/// Only input validation can fail; every network or parse problem past
/// that point ends up in `warnings` instead.
pub async fn execute_analysis(
    options: AnalysisOptions,
    status_callback: Option<StatusCallback>,
    progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisReport> {
    let AnalysisOptions {
        mode,
        inputs,
        exclude,
        workers,
        page_timeout,
        sitemap_timeout,
        show_progress_bars,
        cancel_flag,
    } = options;

    let inputs: Vec<String> = inputs
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if inputs.is_empty() {
        return Err(CoreError::NoInput(match mode {
            AnalysisMode::Index => "Please enter at least one valid Sitemap Index URL.".to_string(),
            AnalysisMode::Sitemaps => "Please enter at least one valid Sitemap URL.".to_string(),
        }));
    }

    let fetcher = HttpFetcher::new()?.with_timeout(page_timeout);
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let (sitemaps, resolution) = match mode {
        AnalysisMode::Index => {
            let resolver = SitemapResolver::new(fetcher.clone()).with_timeout(sitemap_timeout);
            let mut resolution = resolver.resolve(&inputs, exclude.as_deref()).await;
            status(
                &status_callback,
                format!(
                    "Discovered {} sitemap files across {} sitemap index(es).",
                    resolution.discovered,
                    inputs.len()
                ),
            );
            if resolution.excluded > 0 {
                status(
                    &status_callback,
                    format!("Excluded {} sitemaps from the analysis.", resolution.excluded),
                );
            }
            // moved, not copied, so the report lists each problem once
            warnings.append(&mut resolution.warnings);
            errors.append(&mut resolution.errors);
            (resolution.sitemaps.clone(), Some(resolution))
        }
        AnalysisMode::Sitemaps => {
            status(
                &status_callback,
                format!("Discovered {} sitemap file(s).", inputs.len()),
            );
            (inputs.clone(), None)
        }
    };

    status(
        &status_callback,
        format!("Analyzing {} sitemap files. Please wait...", sitemaps.len()),
    );

    let analyzer = SitemapAnalyzer::new(fetcher.clone()).with_timeout(sitemap_timeout);
    let sitemap_bar = show_progress_bars
        .then(|| progress_bar(sitemaps.len(), "[{bar:40.cyan/blue}] {pos}/{len} sitemaps {msg}"));

    let mut summaries = Vec::with_capacity(sitemaps.len());
    for sitemap in &sitemaps {
        if let Some(ref pb) = sitemap_bar {
            pb.set_message(sitemap.clone());
        }
        let summary = analyzer.analyze(sitemap).await;
        if let Some(ref error) = summary.error {
            if summary.malformed {
                errors.push(format!("Sitemap {} is not valid XML: {}", sitemap, error));
            } else {
                warnings.push(format!("Sitemap {} returned no URLs: {}", sitemap, error));
            }
        }
        summaries.push(summary);
        if let Some(ref pb) = sitemap_bar {
            pb.inc(1);
        }
    }
    if let Some(pb) = sitemap_bar {
        pb.finish_and_clear();
    }

    let all_urls: Vec<String> = summaries.iter().flat_map(|s| s.urls.iter().cloned()).collect();
    info!(
        "Analyzed {} sitemaps containing {} URLs",
        summaries.len(),
        all_urls.len()
    );
    status(
        &status_callback,
        format!("Fetching metadata for {} URLs with {} workers...", all_urls.len(), workers),
    );

    let page_bar = show_progress_bars
        .then(|| Arc::new(progress_bar(all_urls.len(), "[{bar:40.green/blue}] {pos}/{len} pages ({eta})")));
    let page_bar_clone = page_bar.clone();
    let combined_progress: ProgressCallback = Arc::new(move |done: usize, total: usize| {
        if let Some(ref pb) = page_bar_clone {
            pb.set_position(done as u64);
        }
        if let Some(ref callback) = progress_callback {
            callback(done, total);
        }
    });

    let mut metadata_fetcher = MetadataFetcher::new(MetadataExtractor::new(fetcher))
        .with_workers(workers)
        .with_progress_callback(combined_progress);
    if let Some(flag) = cancel_flag {
        metadata_fetcher = metadata_fetcher.with_cancel_flag(flag);
    }
    let metadata = metadata_fetcher.fetch_all_indexed(all_urls).await;

    if let Some(pb) = page_bar {
        pb.finish_and_clear();
    }

    let rows = build_report_rows(&summaries, &metadata);
    status(&status_callback, "Analysis Complete".to_string());

    Ok(AnalysisReport {
        mode,
        inputs,
        resolution,
        summaries,
        rows,
        warnings,
        errors,
        generated_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_list_trims_and_drops_blanks() {
        let text = "  https://x.com/sitemap.xml  \n\n\t\nhttps://y.com/sitemap_index.xml\r\n   ";
        assert_eq!(
            parse_url_list(text),
            vec!["https://x.com/sitemap.xml", "https://y.com/sitemap_index.xml"]
        );
        assert!(parse_url_list("\n  \n").is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_fails_before_network() {
        let options = AnalysisOptions::new(AnalysisMode::Index, vec!["   ".to_string()]);
        let result = execute_analysis(options, None, None).await;
        assert!(matches!(result, Err(CoreError::NoInput(_))));

        let options = AnalysisOptions::new(AnalysisMode::Sitemaps, Vec::new());
        let err = execute_analysis(options, None, None).await.unwrap_err();
        assert!(err.to_string().contains("Sitemap URL"));
    }
}
