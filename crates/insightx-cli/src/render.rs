//! Plain-text rendering of API results for the shell.

use insightx_core::insights::{Insights, Severity};
use insightx_core::models::{
    AnalyticsSummary, CorrelationAnalysis, DatasetInfo, DatasetPreview, OutlierAnalysis,
};
use insightx_core::utils::{format_count, format_date, format_metric, truncate_string};

/// Widest a single table cell may get before it is truncated. Dataset ids
/// (36 characters) must fit.
const MAX_CELL_WIDTH: usize = 40;

/// Preview columns shown side by side.
const MAX_PREVIEW_COLUMNS: usize = 8;

/// Left-aligned table with a dashed rule under the header.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| truncate_string(c, MAX_CELL_WIDTH)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &cells {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, row: &[String], widths: &[usize]) {
    let line: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            format!("{:<width$}", cell, width = *width)
        })
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

pub fn datasets(list: &[DatasetInfo]) -> String {
    if list.is_empty() {
        return "No datasets yet. Use `upload <path>` to add one.\n".to_string();
    }
    let rows: Vec<Vec<String>> = list
        .iter()
        .map(|d| {
            vec![
                d.dataset_id.clone(),
                d.filename.clone(),
                d.rows_display(),
                d.columns.map(|c| c.to_string()).unwrap_or_else(|| "N/A".to_string()),
                d.upload_date.as_deref().map(format_date).unwrap_or_default(),
            ]
        })
        .collect();
    let mut out = table(&["ID", "File", "Rows", "Columns", "Uploaded"], &rows);
    out.push_str(&format!("{} dataset(s)\n", list.len()));
    out
}

pub fn preview(preview: &DatasetPreview) -> String {
    let columns: Vec<&str> = preview
        .columns
        .iter()
        .take(MAX_PREVIEW_COLUMNS)
        .map(String::as_str)
        .collect();
    let rows: Vec<Vec<String>> = (0..preview.data.len())
        .map(|row| columns.iter().map(|c| preview.cell(row, c)).collect())
        .collect();

    let mut out = table(&columns, &rows);
    out.push_str(&format!(
        "Showing {} of {} rows",
        format_count(preview.data.len() as u64),
        format_count(preview.total_rows)
    ));
    if preview.columns.len() > MAX_PREVIEW_COLUMNS {
        out.push_str(&format!(
            ", {} of {} columns",
            MAX_PREVIEW_COLUMNS,
            preview.columns.len()
        ));
    }
    out.push('\n');
    out
}

pub fn summary(analytics: &AnalyticsSummary) -> String {
    let info = &analytics.summary;
    let mut out = String::new();
    out.push_str(&format!(
        "{}: {} rows, {} columns\n",
        info.filename.as_deref().unwrap_or(&info.dataset_id),
        format_count(info.total_rows),
        info.total_columns
    ));
    if let Some(health) = &analytics.health {
        out.push_str(&format!(
            "Health score: {}  Missing: {}%  Duplicates: {}\n",
            format_metric(health.score),
            format_metric(health.missing_percentage),
            health.duplicates.map(|d| d.to_string()).unwrap_or_else(|| "N/A".to_string())
        ));
    }

    if !analytics.columns.is_empty() {
        out.push('\n');
        let rows: Vec<Vec<String>> = analytics
            .columns
            .iter()
            .map(|(name, profile)| {
                vec![
                    name.clone(),
                    profile.column_type.clone(),
                    format!("{}%", format_metric(Some(profile.missing_percentage))),
                    format_count(profile.unique_count),
                ]
            })
            .collect();
        out.push_str(&table(&["Column", "Type", "Missing", "Unique"], &rows));
    }

    if !analytics.statistics.is_empty() {
        out.push('\n');
        let rows: Vec<Vec<String>> = analytics
            .statistics
            .iter()
            .map(|(name, s)| {
                vec![
                    name.clone(),
                    format_metric(s.mean),
                    format_metric(s.median),
                    format_metric(s.min),
                    format_metric(s.max),
                    format_metric(s.std),
                ]
            })
            .collect();
        out.push_str(&table(&["Column", "Mean", "Median", "Min", "Max", "Std Dev"], &rows));
    }
    out
}

pub fn correlation(analysis: &CorrelationAnalysis) -> String {
    let counts = &analysis.correlation_summary;
    let mut out = format!(
        "{} pairs: {} strong positive, {} strong negative, {} moderate, {} weak\n",
        counts.total_pairs,
        counts.strong_positive,
        counts.strong_negative,
        counts.moderate_correlations,
        counts.weak_correlations
    );
    if analysis.strong_correlations.is_empty() {
        out.push_str("No strong correlations found.\n");
        return out;
    }
    out.push('\n');
    let rows: Vec<Vec<String>> = analysis
        .strong_correlations
        .iter()
        .map(|p| {
            vec![
                p.column1.clone(),
                p.column2.clone(),
                format_metric(p.correlation),
                p.strength.clone(),
                p.direction.clone(),
            ]
        })
        .collect();
    out.push_str(&table(&["Column", "Column", "r", "Strength", "Direction"], &rows));
    out
}

pub fn outliers(analysis: &OutlierAnalysis) -> String {
    let s = &analysis.outlier_summary;
    let mut out = format!(
        "{} outliers in {} of {} numeric columns ({}%), severity {}\n",
        format_count(s.total_outliers),
        s.affected_columns,
        s.total_numeric_columns,
        format_metric(s.outlier_percentage),
        s.severity.as_deref().unwrap_or("unknown")
    );

    let rows: Vec<Vec<String>> = analysis
        .outliers_by_column
        .iter()
        .filter(|(_, c)| c.summary.total_outliers > 0)
        .map(|(name, c)| {
            vec![
                name.clone(),
                format_count(c.summary.total_outliers),
                format!("{}%", format_metric(c.summary.outlier_percentage)),
                format_metric(c.summary.most_extreme_value),
            ]
        })
        .collect();
    if !rows.is_empty() {
        out.push('\n');
        out.push_str(&table(&["Column", "Outliers", "Share", "Most extreme"], &rows));
    }
    for rec in &analysis.recommendations {
        out.push_str(&format!("- {}\n", rec));
    }
    out
}

pub fn insights(insights: &Insights) -> String {
    let mut out = format!("{}\n", insights.summary);

    if !insights.column_insights.is_empty() {
        out.push_str("\nColumn insights:\n");
        for insight in &insights.column_insights {
            let marker = match insight.severity {
                Severity::Warning => "!",
                Severity::Info => "-",
            };
            out.push_str(&format!("  {} {}: {}\n", marker, insight.column, insight.message));
        }
    }

    if !insights.anomalies.is_empty() {
        out.push_str("\nAnomalies:\n");
        for anomaly in &insights.anomalies {
            out.push_str(&format!("  - {}: {}\n", anomaly.title, anomaly.description));
        }
    }

    out.push_str("\nRecommendations:\n");
    for (i, rec) in insights.recommendations.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, rec));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_alignment() {
        let rows = vec![
            vec!["a".to_string(), "1".to_string()],
            vec!["longer".to_string(), "22".to_string()],
        ];
        let out = table(&["Name", "N"], &rows);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Name    N");
        assert_eq!(lines[1], "------  --");
        assert_eq!(lines[2], "a       1");
        assert_eq!(lines[3], "longer  22");
    }

    #[test]
    fn test_table_truncates_wide_cells() {
        let rows = vec![vec!["x".repeat(100)]];
        let out = table(&["Value"], &rows);
        assert!(out.lines().all(|l| l.chars().count() <= MAX_CELL_WIDTH));
    }

    #[test]
    fn test_datasets_empty() {
        assert!(datasets(&[]).starts_with("No datasets yet"));
    }

    #[test]
    fn test_datasets_keep_full_ids() {
        let list = vec![DatasetInfo {
            dataset_id: "0e65066c-ab20-4da0-b3bf-79dfd0668049".to_string(),
            filename: "sales.csv".to_string(),
            rows: Some(1200),
            columns: Some(8),
            upload_date: Some("2025-01-15T10:30:00Z".to_string()),
        }];
        let out = datasets(&list);
        assert!(out.contains("0e65066c-ab20-4da0-b3bf-79dfd0668049"));
        assert!(out.contains("1,200"));
        assert!(out.contains("Jan 15, 2025"));
        assert!(out.ends_with("1 dataset(s)\n"));
    }

    #[test]
    fn test_insights_rendering() {
        let analytics = AnalyticsSummary::default();
        let generated = insightx_core::insights::generate(&analytics);
        let out = insights(&generated);
        assert!(out.contains("Recommendations:\n  1. "));
        assert!(out.contains("Limited Sample Size"));
    }
}
