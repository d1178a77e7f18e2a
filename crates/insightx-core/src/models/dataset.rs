use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A dataset owned by the current user, as listed by `GET /datasets/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub dataset_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub rows: Option<u64>,
    #[serde(default)]
    pub columns: Option<u64>,
    #[serde(default)]
    pub upload_date: Option<String>,
}

impl DatasetInfo {
    pub fn rows_display(&self) -> String {
        self.rows
            .map(crate::utils::format_count)
            .unwrap_or_else(|| "N/A".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: String,
    pub dataset_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub columns: u64,
}

/// First rows of a dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetPreview {
    pub dataset_id: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub preview_rows: u64,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub filename: String,
}

impl DatasetPreview {
    /// Cell text for a row/column pair, empty for nulls and missing cells.
    pub fn cell(&self, row: usize, column: &str) -> String {
        match self.data.get(row).and_then(|r| r.get(column)) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}
