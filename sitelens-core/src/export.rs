// CSV and JSON export of a finished analysis

use crate::error::Result;
use crate::pipeline::AnalysisReport;
use crate::report::ReportRow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

pub const EXPORT_FILE_NAME: &str = "sitemap_urls.csv";

/// Header row written even when there are no rows.
pub const CSV_HEADERS: [&str; 6] = [
    "Sitemap",
    "URL",
    "Top-Level Directory",
    "Page Title",
    "Meta Description",
    "H1",
];

pub fn write_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(CSV_HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_csv(rows, &mut buffer)?;
    Ok(buffer)
}

pub fn export_csv(rows: &[ReportRow], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    write_csv(rows, BufWriter::new(file))?;
    info!("CSV export saved to {}", output_path.display());
    Ok(())
}

pub fn to_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
