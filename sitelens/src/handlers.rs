use clap::ArgMatches;
use colored::Colorize;
use sitelens_core::export::{export_csv, to_csv_bytes, to_json};
use sitelens_core::report::DEFAULT_PREVIEW_ROWS;
use sitelens_core::{
    AnalysisMode, AnalysisOptions, AnalysisReport, ReportFormat, execute_analysis,
    generate_text_report, parse_url_list,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Install the stderr fmt subscriber. `RUST_LOG` wins unless `verbose` is set.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Collect URLs from repeated `--url` flags and an optional input file.
/// Flag URLs come first, file entries follow in file order.
pub fn load_urls_from_source(
    urls: &[Url],
    input_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    let mut collected: Vec<String> = urls.iter().map(|u| u.as_str().to_string()).collect();

    if let Some(path) = input_file {
        collected.extend(load_urls_from_file(path)?);
    }

    if collected.is_empty() {
        return Err("Either --url or --input-file must be provided".to_string());
    }
    Ok(collected)
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read input file {}: {}", path.display(), e))?;

    let urls: Vec<String> = parse_url_list(&content)
        .iter()
        .filter_map(|line| parse_url_line(line))
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Skipping invalid URL '{}'", line);
    None
}

/// Render the report in the requested format for stdout.
pub fn render_report(
    report: &AnalysisReport,
    format: ReportFormat,
    preview_rows: usize,
) -> Result<String, String> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report, preview_rows)),
        ReportFormat::Json => to_json(report).map_err(|e| e.to_string()),
        ReportFormat::Csv => to_csv_bytes(&report.rows)
            .map_err(|e| e.to_string())
            .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string())),
    }
}

fn print_problems(report: &AnalysisReport) {
    if !report.errors.is_empty() {
        eprintln!();
        eprintln!("{}", "Errors".red().bold());
        for error in &report.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
    }
    if !report.warnings.is_empty() {
        eprintln!();
        eprintln!("{}", "Warnings".yellow().bold());
        for warning in &report.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", "✗".red().bold(), message);
    std::process::exit(1);
}

pub async fn handle_analysis(mode: AnalysisMode, sub_matches: &ArgMatches, quiet: bool) {
    let urls: Vec<Url> = sub_matches
        .get_many::<Url>("url")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let input_file = sub_matches.get_one::<PathBuf>("input-file");
    let threads = *sub_matches.get_one::<usize>("threads").unwrap_or(&10);
    let timeout = *sub_matches.get_one::<u64>("timeout").unwrap_or(&15);
    let sitemap_timeout = *sub_matches.get_one::<u64>("sitemap-timeout").unwrap_or(&60);
    let preview_rows = *sub_matches
        .get_one::<usize>("preview")
        .unwrap_or(&DEFAULT_PREVIEW_ROWS);
    let output = sub_matches
        .get_one::<PathBuf>("output")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(sitelens_core::export::EXPORT_FILE_NAME));
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    // only the index subcommand defines --exclude
    let exclude = match mode {
        AnalysisMode::Index => sub_matches.get_one::<String>("exclude").cloned(),
        AnalysisMode::Sitemaps => None,
    };

    let inputs = match load_urls_from_source(&urls, input_file) {
        Ok(inputs) => inputs,
        Err(e) => fail(e),
    };
    debug!("Loaded {} input URL(s)", inputs.len());

    let mut options = AnalysisOptions::new(mode, inputs);
    options.exclude = exclude;
    options.workers = threads.max(1);
    options.page_timeout = Duration::from_secs(timeout);
    options.sitemap_timeout = Duration::from_secs(sitemap_timeout);
    options.show_progress_bars = !quiet;

    let status_callback = (!quiet).then(|| {
        Arc::new(|msg: String| {
            eprintln!("{} {}", "→".blue(), msg);
        }) as sitelens_core::StatusCallback
    });

    let report = match execute_analysis(options, status_callback, None).await {
        Ok(report) => report,
        Err(e) => fail(e),
    };

    print_problems(&report);

    if let Err(e) = export_csv(&report.rows, &output) {
        fail(format!("Failed to write {}: {}", output.display(), e));
    }
    if !quiet {
        eprintln!(
            "{} Exported {} URLs to {}",
            "✓".green().bold(),
            report.rows.len(),
            display_path(&output).bright_white()
        );
    }

    let rendered = match render_report(&report, format, preview_rows) {
        Ok(rendered) => rendered,
        Err(e) => fail(e),
    };
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(rendered.as_bytes()).and_then(|_| stdout.flush()) {
        fail(e);
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
