use colored::Colorize;

pub mod analyze;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod resolve;

pub use analyze::{SitemapAnalyzer, SitemapSummary};
pub use error::{CoreError, Result};
pub use pipeline::{
    AnalysisMode, AnalysisOptions, AnalysisReport, StatusCallback, execute_analysis, parse_url_list,
};
pub use report::{ReportFormat, ReportRow, SummaryTable, build_report_rows, generate_text_report};
pub use resolve::{Resolution, SitemapResolver, apply_exclusion};

pub fn print_banner() {
    println!(
        "{} {}",
        "sitelens".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    println!("{}", "sitemap analyzer".bright_black());
    println!();
}
