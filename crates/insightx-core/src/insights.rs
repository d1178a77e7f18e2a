//! Narrative insights derived from precomputed analytics.
//!
//! Everything here is a pure function of the analytics response; nothing is
//! fetched.

use serde::Serialize;

use crate::models::{AnalyticsSummary, CorrelationAnalysis, DatasetDashboard, OutlierAnalysis};
use crate::utils::{format_count, format_metric};

/// Most column insights and recommendations reported.
pub const MAX_ITEMS: usize = 8;

const HIGH_MISSING_PCT: f64 = 20.0;
const IMPUTATION_MISSING_PCT: f64 = 10.0;
const HIGH_CARDINALITY: u64 = 50;
const LOW_QUALITY_SCORE: f64 = 80.0;
const MIN_ROWS: u64 = 50;

const GENERIC_RECOMMENDATIONS: [&str; 2] = [
    "Export insights as a report for stakeholder presentations",
    "Set up automated data quality monitoring for future uploads",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInsight {
    pub severity: Severity,
    pub column: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insights {
    pub summary: String,
    pub column_insights: Vec<ColumnInsight>,
    pub anomalies: Vec<Anomaly>,
    pub recommendations: Vec<String>,
}

/// Label for a 0-100 health score.
pub fn quality_label(score: f64) -> &'static str {
    if score >= 90.0 {
        "excellent"
    } else if score >= 80.0 {
        "very good"
    } else if score >= 70.0 {
        "good"
    } else {
        "needs improvement"
    }
}

/// Insights from the summary alone.
pub fn generate(analytics: &AnalyticsSummary) -> Insights {
    build(analytics, None, None)
}

/// Insights using correlation and outlier results as well.
pub fn generate_for_dashboard(dashboard: &DatasetDashboard) -> Insights {
    build(
        &dashboard.summary,
        Some(&dashboard.correlation),
        Some(&dashboard.outliers),
    )
}

fn build(
    analytics: &AnalyticsSummary,
    correlation: Option<&CorrelationAnalysis>,
    outliers: Option<&OutlierAnalysis>,
) -> Insights {
    Insights {
        summary: summary_sentence(analytics),
        column_insights: column_insights(analytics),
        anomalies: anomalies(analytics),
        recommendations: recommendations(analytics, correlation, outliers),
    }
}

fn health_score(analytics: &AnalyticsSummary) -> Option<f64> {
    analytics.health.as_ref().and_then(|h| h.score)
}

fn summary_sentence(analytics: &AnalyticsSummary) -> String {
    let mut text = format!(
        "This dataset contains {} records with {} attributes.",
        format_count(analytics.summary.total_rows),
        analytics.summary.total_columns
    );
    match health_score(analytics) {
        Some(score) => text.push_str(&format!(
            " The data quality is {} with a {}% health score.",
            quality_label(score),
            format_metric(Some(score))
        )),
        None => text.push_str(" No data quality score is available."),
    }
    text
}

fn column_insights(analytics: &AnalyticsSummary) -> Vec<ColumnInsight> {
    let mut insights = Vec::new();
    for (column, profile) in &analytics.columns {
        if profile.missing_percentage > HIGH_MISSING_PCT {
            insights.push(ColumnInsight {
                severity: Severity::Warning,
                column: column.clone(),
                message: format!(
                    "High missing values ({}%) - consider data imputation or collection improvement",
                    format_metric(Some(profile.missing_percentage))
                ),
            });
        }
        if profile.is_categorical() && profile.unique_count > HIGH_CARDINALITY {
            insights.push(ColumnInsight {
                severity: Severity::Warning,
                column: column.clone(),
                message: format!(
                    "High cardinality ({} unique values) - may need grouping for analysis",
                    profile.unique_count
                ),
            });
        }
    }
    insights.truncate(MAX_ITEMS);
    insights
}

fn anomalies(analytics: &AnalyticsSummary) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    if health_score(analytics).is_some_and(|score| score < LOW_QUALITY_SCORE) {
        anomalies.push(Anomaly {
            severity: Severity::Warning,
            title: "Data Quality Concerns".to_string(),
            description: "Some data quality issues detected that may affect analysis accuracy".to_string(),
        });
    }

    let missing_columns = analytics
        .columns
        .values()
        .filter(|profile| profile.missing_percentage > 0.0)
        .count();
    if missing_columns > 2 {
        anomalies.push(Anomaly {
            severity: Severity::Warning,
            title: "Multiple Columns with Missing Data".to_string(),
            description: format!(
                "{} columns have missing values - may indicate systematic data collection issues",
                missing_columns
            ),
        });
    }

    if analytics.summary.total_rows < MIN_ROWS {
        anomalies.push(Anomaly {
            severity: Severity::Warning,
            title: "Limited Sample Size".to_string(),
            description: "Small dataset may limit statistical significance of insights and trends".to_string(),
        });
    }

    if let Some(health) = &analytics.health {
        for issue in &health.issues {
            anomalies.push(Anomaly {
                severity: Severity::Info,
                title: "Health Check".to_string(),
                description: issue.clone(),
            });
        }
    }

    anomalies
}

fn recommendations(
    analytics: &AnalyticsSummary,
    correlation: Option<&CorrelationAnalysis>,
    outliers: Option<&OutlierAnalysis>,
) -> Vec<String> {
    let mut recs = Vec::new();

    let missing = analytics.health.as_ref().and_then(|h| h.missing_percentage);
    if missing.is_some_and(|pct| pct > IMPUTATION_MISSING_PCT) {
        recs.push("Address missing data through external data sources or statistical imputation".to_string());
    }
    if analytics.health.as_ref().and_then(|h| h.duplicates).unwrap_or(0) > 0 {
        recs.push("Remove duplicate records to improve data integrity".to_string());
    }

    if let Some(correlation) = correlation {
        for pair in correlation.strong_correlations.iter().take(2) {
            recs.push(format!(
                "Investigate the {} relationship between {} and {} (r = {})",
                pair.direction,
                pair.column1,
                pair.column2,
                format_metric(pair.correlation)
            ));
        }
    }

    if let Some(outliers) = outliers {
        if outliers.outlier_summary.total_outliers > 0 {
            recs.push(format!(
                "Review {} outliers across {} columns before modeling",
                format_count(outliers.outlier_summary.total_outliers),
                outliers.outlier_summary.affected_columns
            ));
        }
        recs.extend(outliers.recommendations.iter().cloned());
    }

    // The generic entries always make the cut
    recs.truncate(MAX_ITEMS - GENERIC_RECOMMENDATIONS.len());
    recs.extend(GENERIC_RECOMMENDATIONS.iter().map(|r| r.to_string()));
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnProfile, CorrelationPair, HealthReport};

    fn profile(column_type: &str, missing: f64, unique: u64) -> ColumnProfile {
        ColumnProfile {
            column_type: column_type.to_string(),
            missing_percentage: missing,
            unique_count: unique,
            ..ColumnProfile::default()
        }
    }

    fn analytics(rows: u64, score: Option<f64>) -> AnalyticsSummary {
        let mut analytics = AnalyticsSummary::default();
        analytics.summary.total_rows = rows;
        analytics.summary.total_columns = 3;
        analytics.health = Some(HealthReport {
            score,
            ..HealthReport::default()
        });
        analytics
    }

    #[test]
    fn test_quality_label_thresholds() {
        assert_eq!(quality_label(95.0), "excellent");
        assert_eq!(quality_label(90.0), "excellent");
        assert_eq!(quality_label(89.9), "very good");
        assert_eq!(quality_label(80.0), "very good");
        assert_eq!(quality_label(70.0), "good");
        assert_eq!(quality_label(69.0), "needs improvement");
    }

    #[test]
    fn test_summary_sentence() {
        let insights = generate(&analytics(1200, Some(87.0)));
        assert_eq!(
            insights.summary,
            "This dataset contains 1,200 records with 3 attributes. The data quality is very good with a 87% health score."
        );

        let mut no_health = analytics(10, None);
        no_health.health = None;
        assert!(generate(&no_health).summary.ends_with("No data quality score is available."));
    }

    #[test]
    fn test_column_insights() {
        let mut a = analytics(500, Some(95.0));
        a.columns.insert("city".to_string(), profile("categorical", 0.0, 120));
        a.columns.insert("income".to_string(), profile("numeric", 25.0, 300));
        a.columns.insert("age".to_string(), profile("numeric", 20.0, 60));
        a.columns.insert("region".to_string(), profile("categorical", 0.0, 50));

        let insights = generate(&a).column_insights;
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].column, "city");
        assert!(insights[0].message.contains("120 unique values"));
        assert_eq!(insights[1].column, "income");
        assert!(insights[1].message.contains("25%"));
    }

    #[test]
    fn test_column_insights_capped() {
        let mut a = analytics(500, Some(95.0));
        for i in 0..12 {
            a.columns.insert(format!("c{:02}", i), profile("categorical", 40.0, 99));
        }
        assert_eq!(generate(&a).column_insights.len(), MAX_ITEMS);
    }

    #[test]
    fn test_anomalies() {
        let mut a = analytics(20, Some(72.0));
        for name in ["a", "b", "c"] {
            a.columns.insert(name.to_string(), profile("numeric", 1.0, 10));
        }
        if let Some(health) = a.health.as_mut() {
            health.issues = vec!["2 duplicate rows".to_string()];
        }

        let titles: Vec<String> = generate(&a).anomalies.into_iter().map(|x| x.title).collect();
        assert_eq!(
            titles,
            vec![
                "Data Quality Concerns",
                "Multiple Columns with Missing Data",
                "Limited Sample Size",
                "Health Check",
            ]
        );

        let clean = analytics(1000, Some(92.0));
        assert!(generate(&clean).anomalies.is_empty());
    }

    #[test]
    fn test_recommendations_always_include_generic() {
        let recs = generate(&analytics(1000, Some(92.0))).recommendations;
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0], GENERIC_RECOMMENDATIONS[0]);
    }

    #[test]
    fn test_recommendations_from_dashboard() {
        let mut summary = analytics(1000, Some(92.0));
        if let Some(health) = summary.health.as_mut() {
            health.missing_percentage = Some(12.5);
        }
        let mut dashboard = DatasetDashboard {
            summary,
            ..DatasetDashboard::default()
        };
        dashboard.correlation.strong_correlations.push(CorrelationPair {
            column1: "price".to_string(),
            column2: "revenue".to_string(),
            correlation: Some(0.91),
            strength: "strong".to_string(),
            direction: "positive".to_string(),
            interpretation: None,
        });
        dashboard.outliers.outlier_summary.total_outliers = 7;
        dashboard.outliers.outlier_summary.affected_columns = 2;
        dashboard.outliers.recommendations = (0..10).map(|i| format!("backend advice {}", i)).collect();

        let recs = generate_for_dashboard(&dashboard).recommendations;
        assert_eq!(recs.len(), MAX_ITEMS);
        assert!(recs[0].contains("imputation"));
        assert_eq!(recs[1], "Investigate the positive relationship between price and revenue (r = 0.91)");
        assert_eq!(recs[2], "Review 7 outliers across 2 columns before modeling");
        assert_eq!(&recs[6..], &GENERIC_RECOMMENDATIONS.map(String::from));
    }
}
