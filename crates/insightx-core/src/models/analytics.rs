//! Precomputed analytics returned by the `/analytics` endpoints.
//!
//! The backend owns these shapes and omits fields freely, so every field has a
//! default. Sections the client only passes through stay `serde_json::Value`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of `GET /analytics/{id}/summary` and `POST /analytics/{id}/refresh`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSummary {
    pub summary: SummaryInfo,
    pub cleaning_summary: Value,
    pub columns: BTreeMap<String, ColumnProfile>,
    pub statistics: BTreeMap<String, ColumnStatistics>,
    pub categorical: BTreeMap<String, CategoricalStats>,
    pub health: Option<HealthReport>,
    pub advanced_metrics: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryInfo {
    pub dataset_id: String,
    pub total_rows: u64,
    pub total_columns: u64,
    pub filename: Option<String>,
    pub uploaded_at: Option<String>,
    pub analysis_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnProfile {
    #[serde(rename = "type")]
    pub column_type: String,
    pub missing_count: u64,
    pub missing_percentage: f64,
    pub unique_count: u64,
    pub samples: Vec<String>,
}

impl ColumnProfile {
    pub fn is_categorical(&self) -> bool {
        self.column_type == "categorical"
    }
}

/// Descriptive statistics of a numeric column. Values the backend could not
/// compute are absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnStatistics {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoricalStats {
    pub unique_values: Option<u64>,
    pub top_values_detailed: Vec<TopValue>,
    pub high_cardinality: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopValue {
    pub value: String,
    pub count: u64,
    pub percentage: Option<f64>,
}

/// Backend data-quality assessment; `score` is 0-100.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthReport {
    pub score: Option<f64>,
    pub missing_percentage: Option<f64>,
    pub duplicates: Option<u64>,
    pub numeric_pct: Option<f64>,
    pub categorical_pct: Option<f64>,
    pub issues: Vec<String>,
}

/// Response of `GET /analytics/{id}/correlation`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationAnalysis {
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    pub strong_correlations: Vec<CorrelationPair>,
    pub all_correlations: Vec<CorrelationPair>,
    pub correlation_summary: CorrelationSummary,
}

impl CorrelationAnalysis {
    /// Correlation between two columns, if the backend computed one.
    pub fn coefficient(&self, a: &str, b: &str) -> Option<f64> {
        self.correlation_matrix.get(a)?.get(b).copied().flatten()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationPair {
    pub column1: String,
    pub column2: String,
    pub correlation: Option<f64>,
    pub strength: String,
    pub direction: String,
    pub interpretation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationSummary {
    pub total_pairs: u64,
    pub strong_positive: u64,
    pub strong_negative: u64,
    pub moderate_correlations: u64,
    pub weak_correlations: u64,
}

/// Response of `GET /analytics/{id}/outliers`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierAnalysis {
    pub outlier_summary: OutlierSummary,
    pub outliers_by_column: BTreeMap<String, ColumnOutliers>,
    pub outlier_methods: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierSummary {
    pub total_outliers: u64,
    pub affected_columns: u64,
    pub total_numeric_columns: u64,
    pub outlier_percentage: Option<f64>,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOutliers {
    pub column: String,
    pub total_values: u64,
    pub methods: Value,
    pub summary: ColumnOutlierSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOutlierSummary {
    pub total_outliers: u64,
    pub outlier_percentage: Option<f64>,
    pub most_extreme_value: Option<f64>,
}

/// Everything the dataset page shows, fetched together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetDashboard {
    pub summary: AnalyticsSummary,
    pub correlation: CorrelationAnalysis,
    pub outliers: OutlierAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analytics_summary() {
        let json = r#"{
            "summary": {"dataset_id": "d1", "total_rows": 120, "total_columns": 3,
                        "filename": "sales.csv", "analysis_timestamp": "2025-03-01T10:00:00"},
            "cleaning_summary": {"duplicates_removed": 2},
            "columns": {
                "region": {"type": "categorical", "missing_count": 0, "missing_percentage": 0.0,
                           "unique_count": 4, "samples": ["N", "S", "E"]},
                "revenue": {"type": "numeric", "missing_count": 6, "missing_percentage": 5.0,
                            "unique_count": 110, "samples": ["1.0"]}
            },
            "statistics": {"revenue": {"mean": 10.5, "median": 9.0, "min": 1.0, "max": 50.0, "std": 4.2}},
            "categorical": {"region": {"unique_values": 4, "top_values": {"N": 40},
                            "top_values_detailed": [{"value": "N", "count": 40, "percentage": 33.33}],
                            "high_cardinality": false}},
            "health": {"score": 87, "missing_percentage": 1.67, "duplicates": 2, "issues": []},
            "advanced_metrics": {}
        }"#;

        let analytics: AnalyticsSummary = serde_json::from_str(json).expect("summary should parse");
        assert_eq!(analytics.summary.total_rows, 120);
        assert!(analytics.columns["region"].is_categorical());
        assert_eq!(analytics.statistics["revenue"].p25, None);
        assert_eq!(analytics.categorical["region"].top_values_detailed[0].count, 40);
        assert_eq!(analytics.health.as_ref().and_then(|h| h.score), Some(87.0));
    }

    #[test]
    fn test_parse_empty_summary() {
        let analytics: AnalyticsSummary = serde_json::from_str("{}").expect("empty summary should parse");
        assert!(analytics.columns.is_empty());
        assert!(analytics.health.is_none());
    }

    #[test]
    fn test_correlation_coefficient_lookup() {
        let json = r#"{
            "correlation_matrix": {"a": {"a": 1.0, "b": 0.82}, "b": {"a": 0.82, "b": null}},
            "strong_correlations": [{"column1": "a", "column2": "b", "correlation": 0.82,
                                     "strength": "strong", "direction": "positive"}],
            "correlation_summary": {"total_pairs": 1, "strong_positive": 1}
        }"#;
        let corr: CorrelationAnalysis = serde_json::from_str(json).expect("correlation should parse");
        assert_eq!(corr.coefficient("a", "b"), Some(0.82));
        assert_eq!(corr.coefficient("b", "b"), None);
        assert_eq!(corr.coefficient("a", "zzz"), None);
        assert_eq!(corr.correlation_summary.weak_correlations, 0);
    }

    #[test]
    fn test_parse_outliers() {
        let json = r#"{
            "outlier_summary": {"total_outliers": 3, "affected_columns": 1, "total_numeric_columns": 2,
                                "outlier_percentage": 1.25, "severity": "low"},
            "outliers_by_column": {"revenue": {"column": "revenue", "total_values": 120,
                                   "methods": {"iqr": {"count": 3}},
                                   "summary": {"total_outliers": 3, "outlier_percentage": 2.5,
                                               "most_extreme_value": 50.0}}},
            "outlier_methods": ["IQR (Interquartile Range)"],
            "recommendations": ["Review revenue"]
        }"#;
        let outliers: OutlierAnalysis = serde_json::from_str(json).expect("outliers should parse");
        assert_eq!(outliers.outlier_summary.severity.as_deref(), Some("low"));
        assert_eq!(outliers.outliers_by_column["revenue"].summary.total_outliers, 3);
    }
}
