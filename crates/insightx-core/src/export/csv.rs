use crate::utils::format_metric;

use super::ReportData;

/// Quote a field if it contains a comma, quote or newline.
fn field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn row(cells: &[String]) -> String {
    let mut line = cells.iter().map(|c| field(c)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

/// Sectioned CSV summary of the analytics.
pub fn render_csv(data: &ReportData<'_>) -> String {
    let analytics = data.analytics;
    let summary = &analytics.summary;
    let mut out = String::new();

    out.push_str("InsightX Analytics Report\n");
    out.push_str(&row(&["Generated on:".to_string(), data.generated_on()]));
    out.push('\n');

    out.push_str("DATASET SUMMARY\n");
    let filename = summary.filename.as_deref().unwrap_or(data.filename);
    out.push_str(&row(&["Filename".to_string(), filename.to_string()]));
    out.push_str(&row(&["Total Rows".to_string(), summary.total_rows.to_string()]));
    out.push_str(&row(&["Total Columns".to_string(), summary.total_columns.to_string()]));
    out.push('\n');

    if !analytics.statistics.is_empty() {
        out.push_str("STATISTICAL ANALYSIS\n");
        out.push_str("Column,Mean,Median,Min,Max,Standard Deviation\n");
        for (column, stats) in &analytics.statistics {
            out.push_str(&row(&[
                column.clone(),
                format_metric(stats.mean),
                format_metric(stats.median),
                format_metric(stats.min),
                format_metric(stats.max),
                format_metric(stats.std),
            ]));
        }
        out.push('\n');
    }

    if let Some(health) = &analytics.health {
        out.push_str("DATA QUALITY\n");
        out.push_str(&row(&["Health Score".to_string(), format_metric(health.score)]));
        out.push_str(&row(&[
            "Missing Data Percentage".to_string(),
            format_metric(health.missing_percentage),
        ]));
        out.push_str(&row(&[
            "Duplicate Rows".to_string(),
            health.duplicates.map(|d| d.to_string()).unwrap_or_else(|| "N/A".to_string()),
        ]));
    }

    out
}
