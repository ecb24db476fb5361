// Summary and detail tables built from analyzed sitemaps

use crate::analyze::SitemapSummary;
use crate::pipeline::{AnalysisMode, AnalysisReport};
use serde::{Deserialize, Serialize};
use sitelens_scanner::{IndexedMetadata, PageMetadata, top_level_directory};
use std::collections::HashMap;

pub const TOTAL_LABEL: &str = "TOTAL";
pub const URL_COUNT_COLUMN: &str = "URL Count";
pub const DEFAULT_PREVIEW_ROWS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

/// One page URL joined with its sitemap, bucket and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Sitemap")]
    pub sitemap_url: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Top-Level Directory")]
    pub top_level_directory: String,
    #[serde(rename = "Page Title")]
    pub title: String,
    #[serde(rename = "Meta Description")]
    pub description: String,
    #[serde(rename = "H1")]
    pub h1: String,
}

/// Join summaries with metadata by input index, where index `i` is the
/// `i`-th URL across all summaries in order. Arrival order is irrelevant
/// and a URL listed twice keeps both outcomes. A missing or mismatched
/// entry gives empty fields.
pub fn build_report_rows(summaries: &[SitemapSummary], metadata: &[IndexedMetadata]) -> Vec<ReportRow> {
    let by_index: HashMap<usize, &PageMetadata> = metadata.iter().map(|(i, m)| (*i, m)).collect();

    summaries
        .iter()
        .flat_map(|summary| summary.urls.iter().map(move |url| (summary, url)))
        .enumerate()
        .map(|(index, (summary, url))| {
            let page = by_index.get(&index).filter(|m| m.url == *url);
            ReportRow {
                sitemap_url: summary.sitemap_url.clone(),
                url: url.clone(),
                top_level_directory: top_level_directory(url),
                title: page.map(|m| m.title.clone()).unwrap_or_default(),
                description: page.map(|m| m.description.clone()).unwrap_or_default(),
                h1: page.map(|m| m.h1.clone()).unwrap_or_default(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub url_count: usize,
    /// One count per entry in [`SummaryTable::directories`]
    pub counts: Vec<usize>,
}

/// Per-sitemap URL counts broken down by directory, `TOTAL` first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub directories: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn from_summaries(summaries: &[SitemapSummary]) -> Self {
        let mut directories: Vec<String> = Vec::new();
        for summary in summaries {
            for label in summary.directories_in_order() {
                if !directories.contains(&label) {
                    directories.push(label);
                }
            }
        }

        let mut rows: Vec<SummaryRow> = summaries
            .iter()
            .map(|summary| SummaryRow {
                label: summary.sitemap_url.clone(),
                url_count: summary.url_count,
                counts: directories
                    .iter()
                    .map(|d| summary.directory_histogram.get(d).copied().unwrap_or(0))
                    .collect(),
            })
            .collect();
        rows.sort_by(|a, b| b.url_count.cmp(&a.url_count));

        let total = SummaryRow {
            label: TOTAL_LABEL.to_string(),
            url_count: rows.iter().map(|r| r.url_count).sum(),
            counts: (0..directories.len())
                .map(|i| rows.iter().map(|r| r.counts[i]).sum())
                .collect(),
        };
        rows.insert(0, total);

        Self { directories, rows }
    }

    pub fn total(&self) -> &SummaryRow {
        &self.rows[0]
    }

    pub fn columns(&self) -> Vec<String> {
        std::iter::once(URL_COUNT_COLUMN.to_string())
            .chain(self.directories.iter().cloned())
            .collect()
    }

    /// Render as an aligned plain-text table.
    pub fn render(&self) -> String {
        let label_width = self
            .rows
            .iter()
            .map(|r| r.label.chars().count())
            .max()
            .unwrap_or(0)
            .max("Sitemap".len());
        let columns = self.columns();
        let widths: Vec<usize> = columns.iter().map(|c| c.chars().count().max(5)).collect();

        let mut out = String::new();
        out.push_str(&format!("{:<width$}", "Sitemap", width = label_width));
        for (column, width) in columns.iter().zip(&widths) {
            out.push_str(&format!("  {:>width$}", column, width = width));
        }
        out.push('\n');

        for row in &self.rows {
            out.push_str(&format!("{:<width$}", row.label, width = label_width));
            let values = std::iter::once(row.url_count).chain(row.counts.iter().copied());
            for (value, width) in values.zip(&widths) {
                out.push_str(&format!("  {:>width$}", value, width = width));
            }
            out.push('\n');
        }
        out
    }
}

/// Build the human-readable report: overview, summary table and a preview
/// of the first `preview_rows` detail rows.
pub fn generate_text_report(report: &AnalysisReport, preview_rows: usize) -> String {
    let table = SummaryTable::from_summaries(&report.summaries);
    let mut out = String::new();

    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str("Analysis Overview\n");
    if report.mode == AnalysisMode::Index {
        out.push_str(&format!("  Number of Sitemap Indexes: {}\n", report.inputs.len()));
    }
    out.push_str(&format!("  Number of Sitemaps: {}\n", report.summaries.len()));
    out.push_str(&format!("  Number of URLs: {}\n", table.total().url_count));
    out.push_str(&format!(
        "  Number of Top Level Directories: {}\n",
        table.directories.len()
    ));
    out.push('\n');
    out.push_str(&table.render());

    out.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    out.push_str("All URLs\n");
    for row in report.rows.iter().take(preview_rows) {
        out.push_str(&format!("  {} [{}]\n", row.url, row.top_level_directory));
        if !row.title.is_empty() {
            out.push_str(&format!("      Title: {}\n", row.title));
        }
        if !row.description.is_empty() {
            out.push_str(&format!("      Description: {}\n", row.description));
        }
        if !row.h1.is_empty() {
            out.push_str(&format!("      H1: {}\n", row.h1));
        }
    }
    if report.rows.len() > preview_rows {
        out.push_str(&format!(
            "\nNote: This is just a preview. The full dataset contains {} URLs.\n",
            report.rows.len()
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(sitemap: &str, urls: &[&str]) -> SitemapSummary {
        SitemapSummary::from_urls(sitemap.to_string(), urls.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_summary_table_total_first_and_sorted() {
        let summaries = vec![
            summary("https://x.com/small.xml", &["https://x.com/blog/a"]),
            summary(
                "https://x.com/big.xml",
                &["https://x.com/", "https://x.com/docs/a", "https://x.com/blog/b"],
            ),
        ];
        let table = SummaryTable::from_summaries(&summaries);

        assert_eq!(table.directories, vec!["blog", "Homepage", "docs"]);
        assert_eq!(table.columns()[0], "URL Count");
        assert_eq!(table.rows[0].label, "TOTAL");
        assert_eq!(table.rows[0].url_count, 4);
        assert_eq!(table.rows[0].counts, vec![2, 1, 1]);
        assert_eq!(table.rows[1].label, "https://x.com/big.xml");
        assert_eq!(table.rows[1].counts, vec![1, 1, 1]);
        assert_eq!(table.rows[2].label, "https://x.com/small.xml");
        assert_eq!(table.rows[2].counts, vec![1, 0, 0]);
    }

    #[test]
    fn test_summary_table_with_no_sitemaps() {
        let table = SummaryTable::from_summaries(&[]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.total().url_count, 0);
        assert!(table.directories.is_empty());
    }

    #[test]
    fn test_render_contains_all_labels() {
        let summaries = vec![summary("https://x.com/s.xml", &["https://x.com/blog/a"])];
        let rendered = SummaryTable::from_summaries(&summaries).render();
        assert!(rendered.starts_with("Sitemap"));
        assert!(rendered.contains("URL Count"));
        assert!(rendered.contains("TOTAL"));
        assert!(rendered.contains("https://x.com/s.xml"));
        assert!(rendered.contains("blog"));
    }

    #[test]
    fn test_join_is_by_index_not_arrival_order() {
        let summaries = vec![summary("https://x.com/s.xml", &["https://x.com/a/1", "https://x.com/b/2"])];
        let mut second = PageMetadata::new("https://x.com/b/2".to_string());
        second.title = "Two".to_string();
        let mut first = PageMetadata::new("https://x.com/a/1".to_string());
        first.title = "One".to_string();

        let rows = build_report_rows(&summaries, &[(1, second), (0, first)]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].url, "https://x.com/a/1");
        assert_eq!(rows[0].title, "One");
        assert_eq!(rows[0].top_level_directory, "a");
        assert_eq!(rows[1].title, "Two");
        assert_eq!(rows[1].sitemap_url, "https://x.com/s.xml");
    }

    #[test]
    fn test_repeated_url_keeps_each_outcome() {
        let summaries = vec![
            summary("https://x.com/a.xml", &["https://x.com/p/1"]),
            summary("https://x.com/b.xml", &["https://x.com/p/1"]),
        ];
        let mut ok = PageMetadata::new("https://x.com/p/1".to_string());
        ok.title = "Title".to_string();
        let failed = PageMetadata::with_error("https://x.com/p/1".to_string(), "timeout".to_string());

        let rows = build_report_rows(&summaries, &[(1, failed), (0, ok)]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sitemap_url, "https://x.com/a.xml");
        assert_eq!(rows[0].title, "Title");
        assert_eq!(rows[1].sitemap_url, "https://x.com/b.xml");
        assert!(rows[1].title.is_empty());
    }

    #[test]
    fn test_mismatched_index_is_ignored() {
        let summaries = vec![summary("https://x.com/s.xml", &["https://x.com/a/1"])];
        let mut other = PageMetadata::new("https://x.com/elsewhere".to_string());
        other.title = "Wrong".to_string();

        let rows = build_report_rows(&summaries, &[(0, other)]);

        assert!(rows[0].title.is_empty());
    }

    #[test]
    fn test_missing_metadata_gives_empty_fields() {
        let summaries = vec![summary("https://x.com/s.xml", &["https://x.com/"])];
        let rows = build_report_rows(&summaries, &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].top_level_directory, "Homepage");
        assert!(rows[0].title.is_empty() && rows[0].description.is_empty() && rows[0].h1.is_empty());
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!(ReportFormat::from_str("TEXT"), Some(ReportFormat::Text));
        assert_eq!(ReportFormat::from_str("json"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::from_str("Csv"), Some(ReportFormat::Csv));
        assert_eq!(ReportFormat::from_str("html"), None);
    }
}
