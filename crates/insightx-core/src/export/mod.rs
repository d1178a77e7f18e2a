//! Report export: HTML, CSV, Excel and JSON.
//!
//! Each format has an in-memory renderer; `export_report` writes the result
//! into a directory. A PDF is obtained by printing the HTML report, which
//! carries its own print stylesheet.

mod csv;
mod excel;
mod html;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::insights::Insights;
use crate::models::{AnalyticsSummary, DatasetPreview};

pub use self::csv::render_csv;
pub use self::excel::render_xlsx;
pub use self::html::{escape_html, render_html};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Csv,
    Excel,
    Json,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 4] = [
        ReportFormat::Html,
        ReportFormat::Csv,
        ReportFormat::Excel,
        ReportFormat::Json,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Csv => "csv",
            ReportFormat::Excel => "xlsx",
            ReportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" | "htm" | "pdf" => Ok(ReportFormat::Html),
            "csv" => Ok(ReportFormat::Csv),
            "xlsx" | "excel" => Ok(ReportFormat::Excel),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("Unknown report format '{}' (expected html, csv, xlsx or json)", other)),
        }
    }
}

/// Sections included in the HTML report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub include_summary: bool,
    pub include_data_preview: bool,
    pub include_insights: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_data_preview: true,
            include_insights: true,
        }
    }
}

/// Everything a report is rendered from.
#[derive(Debug, Clone)]
pub struct ReportData<'a> {
    pub filename: &'a str,
    pub analytics: &'a AnalyticsSummary,
    pub preview: Option<&'a DatasetPreview>,
    pub insights: Option<&'a Insights>,
    pub options: ReportOptions,
    pub generated_at: DateTime<Utc>,
}

impl<'a> ReportData<'a> {
    pub fn new(filename: &'a str, analytics: &'a AnalyticsSummary) -> Self {
        Self {
            filename,
            analytics,
            preview: None,
            insights: None,
            options: ReportOptions::default(),
            generated_at: Utc::now(),
        }
    }

    pub fn with_preview(mut self, preview: &'a DatasetPreview) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_insights(mut self, insights: &'a Insights) -> Self {
        self.insights = Some(insights);
        self
    }

    pub fn with_options(mut self, options: ReportOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn generated_on(&self) -> String {
        self.generated_at.format("%b %d, %Y").to_string()
    }
}

/// `sales.csv` becomes `sales_report`.
pub fn default_stem(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("insightx");
    format!("{}_report", stem)
}

/// Render the report in memory.
pub fn render(data: &ReportData<'_>, format: ReportFormat) -> Result<Vec<u8>, ExportError> {
    Ok(match format {
        ReportFormat::Html => render_html(data).into_bytes(),
        ReportFormat::Csv => render_csv(data).into_bytes(),
        ReportFormat::Excel => render_xlsx(data)?,
        ReportFormat::Json => serde_json::to_vec_pretty(data.analytics)?,
    })
}

/// Render the report and write it to `dir/stem.<ext>`, creating `dir` if
/// needed. Returns the written path.
pub fn export_report(
    data: &ReportData<'_>,
    format: ReportFormat,
    dir: &Path,
    stem: &str,
) -> Result<PathBuf, ExportError> {
    let bytes = render(data, format)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", stem, format.extension()));
    std::fs::write(&path, bytes)?;
    info!(path = %path.display(), format = %format, "Report exported");
    Ok(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ColumnStatistics, HealthReport};

    /// Analytics with one numeric column and a health report.
    pub(crate) fn sample_analytics() -> AnalyticsSummary {
        let mut analytics = AnalyticsSummary::default();
        analytics.summary.filename = Some("sales, 2024.csv".to_string());
        analytics.summary.total_rows = 1200;
        analytics.summary.total_columns = 4;
        analytics.statistics.insert(
            "revenue".to_string(),
            ColumnStatistics {
                mean: Some(10.5),
                median: Some(9.0),
                min: Some(0.0),
                max: Some(50.25),
                std: None,
                ..ColumnStatistics::default()
            },
        );
        analytics.health = Some(HealthReport {
            score: Some(87.0),
            missing_percentage: Some(1.5),
            duplicates: Some(0),
            ..HealthReport::default()
        });
        analytics
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("HTML".parse::<ReportFormat>(), Ok(ReportFormat::Html));
        assert_eq!("pdf".parse::<ReportFormat>(), Ok(ReportFormat::Html));
        assert_eq!("excel".parse::<ReportFormat>(), Ok(ReportFormat::Excel));
        assert!("docx".parse::<ReportFormat>().is_err());
        for format in ReportFormat::ALL {
            assert_eq!(format.extension().parse::<ReportFormat>(), Ok(format));
        }
    }

    #[test]
    fn test_default_stem() {
        assert_eq!(default_stem("sales.csv"), "sales_report");
        assert_eq!(default_stem("q1.data.xlsx"), "q1.data_report");
        assert_eq!(default_stem("noext"), "noext_report");
        assert_eq!(default_stem(""), "insightx_report");
    }

    #[test]
    fn test_export_report_writes_every_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("reports");
        let analytics = sample_analytics();
        let data = ReportData::new("sales.csv", &analytics);

        for format in ReportFormat::ALL {
            let path = export_report(&data, format, &out, "sales_report").expect("export should succeed");
            assert_eq!(path, out.join(format!("sales_report.{}", format.extension())));
            let bytes = std::fs::read(&path).expect("report should exist");
            assert!(!bytes.is_empty());
        }
    }

    #[test]
    fn test_json_report_round_trips_analytics() {
        let analytics = sample_analytics();
        let data = ReportData::new("sales.csv", &analytics);
        let bytes = render(&data, ReportFormat::Json).expect("json render");
        let parsed: AnalyticsSummary = serde_json::from_slice(&bytes).expect("json report should parse");
        assert_eq!(parsed.summary.total_rows, 1200);
        assert_eq!(parsed.statistics["revenue"].max, Some(50.25));
    }

    #[test]
    fn test_excel_is_zip_container() {
        let analytics = sample_analytics();
        let data = ReportData::new("sales.csv", &analytics);
        let bytes = render(&data, ReportFormat::Excel).expect("xlsx render");
        assert_eq!(&bytes[..2], b"PK");
    }
}
