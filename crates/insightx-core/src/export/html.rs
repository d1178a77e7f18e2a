use std::fmt::Write;

use crate::insights::{quality_label, Severity};
use crate::utils::{format_count, format_metric, truncate_string};

use super::ReportData;

/// Longest cell text shown in the data preview table.
const PREVIEW_CELL_MAX: usize = 40;

const STYLE: &str = r#"
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; color: #333;
       max-width: 1200px; margin: 0 auto; padding: 20px; background: #f8f9fa; }
.header { background: linear-gradient(135deg, #6366f1, #8b5cf6); color: white; padding: 30px;
          border-radius: 10px; margin-bottom: 30px; text-align: center; }
.header h1 { margin: 0; font-size: 2.2em; }
.header p { margin: 10px 0 0 0; opacity: 0.9; }
.section { background: white; padding: 25px; margin-bottom: 20px; border-radius: 10px;
           box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
.section h2 { color: #6366f1; border-bottom: 2px solid #e5e7eb; padding-bottom: 10px; }
.stats-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 20px; }
.stat-card { background: #f8f9fa; padding: 20px; border-radius: 8px; text-align: center;
             border-left: 4px solid #6366f1; }
.stat-value { font-size: 2em; font-weight: bold; color: #6366f1; }
.stat-label { color: #666; font-size: 0.9em; }
table { border-collapse: collapse; width: 100%; font-size: 0.9em; }
th, td { border: 1px solid #e5e7eb; padding: 6px 10px; text-align: left; }
th { background: #f3f4f6; }
.warning { color: #b45309; }
.footer { text-align: center; color: #666; font-size: 0.85em; margin-top: 30px; }
@media print {
    body { background: white; max-width: none; }
    .section { box-shadow: none; border: 1px solid #ddd; page-break-inside: avoid; }
    .header { background: none; color: #333; border-bottom: 2px solid #6366f1; }
}
"#;

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn stat_card(out: &mut String, value: &str, label: &str) {
    let _ = write!(
        out,
        r#"<div class="stat-card"><div class="stat-value">{}</div><div class="stat-label">{}</div></div>"#,
        escape_html(value),
        escape_html(label)
    );
}

fn overview_section(out: &mut String, data: &ReportData<'_>) {
    let analytics = data.analytics;
    let health = analytics.health.as_ref();
    let missing = health.and_then(|h| h.missing_percentage).unwrap_or(0.0);

    out.push_str("<div class=\"section\">\n<h2>Dataset Overview</h2>\n<div class=\"stats-grid\">");
    stat_card(out, &format_count(analytics.summary.total_rows), "Total Records");
    stat_card(out, &analytics.summary.total_columns.to_string(), "Data Attributes");
    stat_card(
        out,
        &format!("{}%", format_metric(health.and_then(|h| h.score))),
        "Data Quality Score",
    );
    stat_card(out, &format!("{:.1}%", 100.0 - missing), "Data Completeness");
    out.push_str("</div>\n</div>\n");
}

fn columns_section(out: &mut String, data: &ReportData<'_>) {
    let analytics = data.analytics;
    if analytics.columns.is_empty() {
        return;
    }
    out.push_str("<div class=\"section\">\n<h2>Data Structure Analysis</h2>\n<table>\n");
    out.push_str("<tr><th>Column</th><th>Type</th><th>Missing</th><th>Unique</th><th>Mean</th></tr>\n");
    for (column, profile) in &analytics.columns {
        let mean = analytics.statistics.get(column).and_then(|s| s.mean);
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}%</td><td>{}</td><td>{}</td></tr>",
            escape_html(column),
            escape_html(&profile.column_type),
            format_metric(Some(profile.missing_percentage)),
            format_count(profile.unique_count),
            format_metric(mean)
        );
    }
    out.push_str("</table>\n</div>\n");
}

fn quality_section(out: &mut String, data: &ReportData<'_>) {
    let Some(health) = data.analytics.health.as_ref() else {
        return;
    };
    let missing_columns = data
        .analytics
        .columns
        .values()
        .filter(|p| p.missing_percentage > 0.0)
        .count();

    out.push_str("<div class=\"section\">\n<h2>Data Quality Assessment</h2>\n<div class=\"stats-grid\">");
    stat_card(out, &format!("{}%", format_metric(health.score)), "Overall Quality Score");
    stat_card(out, &health.duplicates.unwrap_or(0).to_string(), "Duplicate Records");
    stat_card(out, &missing_columns.to_string(), "Columns with Missing Data");
    out.push_str("</div>\n");

    if let Some(score) = health.score {
        let _ = writeln!(
            out,
            "<p><strong>Overall Health:</strong> {} ({}% score)</p>",
            escape_html(quality_label(score)),
            format_metric(Some(score))
        );
    }
    if !health.issues.is_empty() {
        out.push_str("<ul>\n");
        for issue in &health.issues {
            let _ = writeln!(out, "<li class=\"warning\">{}</li>", escape_html(issue));
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</div>\n");
}

fn preview_section(out: &mut String, data: &ReportData<'_>) {
    let Some(preview) = data.preview else {
        return;
    };
    let _ = writeln!(
        out,
        "<div class=\"section\">\n<h2>Data Preview</h2>\n<p>Showing {} of {} rows</p>\n<table>",
        format_count(preview.data.len() as u64),
        format_count(preview.total_rows)
    );
    out.push_str("<tr>");
    for column in &preview.columns {
        let _ = write!(out, "<th>{}</th>", escape_html(column));
    }
    out.push_str("</tr>\n");
    for row in 0..preview.data.len() {
        out.push_str("<tr>");
        for column in &preview.columns {
            let cell = truncate_string(&preview.cell(row, column), PREVIEW_CELL_MAX);
            let _ = write!(out, "<td>{}</td>", escape_html(&cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n</div>\n");
}

fn insights_section(out: &mut String, data: &ReportData<'_>) {
    let Some(insights) = data.insights else {
        return;
    };
    out.push_str("<div class=\"section\">\n<h2>Insights</h2>\n");
    let _ = writeln!(out, "<p>{}</p>", escape_html(&insights.summary));

    if !insights.column_insights.is_empty() {
        out.push_str("<h3>Column Insights</h3>\n<ul>\n");
        for insight in &insights.column_insights {
            let class = match insight.severity {
                Severity::Warning => " class=\"warning\"",
                Severity::Info => "",
            };
            let _ = writeln!(
                out,
                "<li{}><strong>{}:</strong> {}</li>",
                class,
                escape_html(&insight.column),
                escape_html(&insight.message)
            );
        }
        out.push_str("</ul>\n");
    }

    if !insights.anomalies.is_empty() {
        out.push_str("<h3>Anomalies</h3>\n<ul>\n");
        for anomaly in &insights.anomalies {
            let _ = writeln!(
                out,
                "<li><strong>{}:</strong> {}</li>",
                escape_html(&anomaly.title),
                escape_html(&anomaly.description)
            );
        }
        out.push_str("</ul>\n");
    }

    out.push_str("<h3>Recommendations</h3>\n<ol>\n");
    for rec in &insights.recommendations {
        let _ = writeln!(out, "<li>{}</li>", escape_html(rec));
    }
    out.push_str("</ol>\n</div>\n");
}

/// Standalone HTML report. Print it to get a PDF.
pub fn render_html(data: &ReportData<'_>) -> String {
    let filename = data.analytics.summary.filename.as_deref().unwrap_or(data.filename);
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    let _ = writeln!(out, "<title>InsightX Report - {}</title>", escape_html(filename));
    let _ = writeln!(out, "<style>{}</style>\n</head>\n<body>", STYLE);

    let _ = writeln!(
        out,
        "<div class=\"header\">\n<h1>InsightX Analytics Report</h1>\n<p><strong>{}</strong></p>\n<p>Generated on {}</p>\n</div>",
        escape_html(filename),
        escape_html(&data.generated_on())
    );

    if data.options.include_summary {
        overview_section(&mut out, data);
    }
    columns_section(&mut out, data);
    quality_section(&mut out, data);
    if data.options.include_data_preview {
        preview_section(&mut out, data);
    }
    if data.options.include_insights {
        insights_section(&mut out, data);
    }

    out.push_str("<div class=\"footer\">Generated by InsightX</div>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_analytics;
    use crate::export::ReportOptions;
    use crate::insights;
    use crate::models::{ColumnProfile, DatasetPreview};

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#39;y&#39;&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_render_html_escapes_backend_text() {
        let mut analytics = sample_analytics();
        analytics.columns.insert(
            "<img src=x onerror=alert(1)>".to_string(),
            ColumnProfile {
                column_type: "categorical".to_string(),
                ..ColumnProfile::default()
            },
        );
        let data = ReportData::new("sales.csv", &analytics);
        let html = render_html(&data);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("@media print"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;"));
        assert!(html.contains("Dataset Overview"));
        assert!(html.contains("1,200"));
    }

    #[test]
    fn test_render_html_respects_options() {
        let analytics = sample_analytics();
        let generated = insights::generate(&analytics);
        let preview = DatasetPreview {
            columns: vec!["revenue".to_string()],
            data: vec![serde_json::from_str(r#"{"revenue": 10.5}"#).expect("row")],
            total_rows: 1200,
            ..DatasetPreview::default()
        };

        let full = ReportData::new("sales.csv", &analytics)
            .with_preview(&preview)
            .with_insights(&generated);
        let html = render_html(&full);
        assert!(html.contains("Data Preview"));
        assert!(html.contains("<td>10.5</td>"));
        assert!(html.contains("Recommendations"));

        let trimmed = full.with_options(ReportOptions {
            include_summary: false,
            include_data_preview: false,
            include_insights: false,
        });
        let html = render_html(&trimmed);
        assert!(!html.contains("Dataset Overview"));
        assert!(!html.contains("Data Preview"));
        assert!(!html.contains("Recommendations"));
        assert!(html.contains("Data Quality Assessment"));
    }
}
