//! Dataset listing, upload, preview and deletion.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::models::{DatasetInfo, DatasetPreview, MessageResponse, UploadResponse};
use crate::utils::format_bytes;
use crate::validation;

use super::{ApiClient, ApiError, ApiRequest, UploadFile};

const DATASET_NOT_FOUND: &str = "Dataset not found";

/// Content type sent for an upload, chosen by file extension.
fn upload_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        _ => "application/octet-stream",
    }
}

impl ApiClient {
    /// Datasets owned by the logged-in user.
    pub async fn list_datasets(&self) -> Result<Vec<DatasetInfo>, ApiError> {
        let datasets: Vec<DatasetInfo> = self
            .send(ApiRequest::get("/datasets/"))
            .await
            .map_err(|e| e.at_call_site(DATASET_NOT_FOUND, "Failed to load datasets"))?;
        debug!(count = datasets.len(), "Fetched datasets");
        Ok(datasets)
    }

    /// Upload a CSV or Excel file. Size and type are checked before the file
    /// is read.
    pub async fn upload_dataset(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ApiError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
        validation::validate_upload(path, metadata.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Validation(format!("Cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dataset")
            .to_string();

        info!(file = %file_name, size = %format_bytes(bytes.len() as u64), "Uploading dataset");
        let request = ApiRequest::post("/datasets/upload")
            .file(UploadFile {
                file_name,
                mime_type: upload_mime_type(path),
                bytes,
            })
            .timeout(self.upload_timeout());

        self.send(request).await.map_err(|e| {
            warn!(error = %e, "Upload failed");
            match e {
                ApiError::Status { status: 413, .. } => ApiError::Validation("File too large".to_string()),
                ApiError::Status { status: 400, ref body } => ApiError::Validation(
                    ApiError::detail_message(body).unwrap_or_else(|| "Invalid file".to_string()),
                ),
                e if e.is_transport() => e,
                _ => ApiError::Unknown("Upload failed. Please try again.".to_string()),
            }
        })
    }

    pub async fn dataset_preview(&self, dataset_id: &str) -> Result<DatasetPreview, ApiError> {
        validation::validate_dataset_id(dataset_id)?;
        self.send(ApiRequest::get(format!("/datasets/{}/preview", dataset_id)))
            .await
            .map_err(|e| e.at_call_site(DATASET_NOT_FOUND, "Failed to load dataset preview"))
    }

    pub async fn delete_dataset(&self, dataset_id: &str) -> Result<MessageResponse, ApiError> {
        validation::validate_dataset_id(dataset_id)?;
        let response = self
            .send(ApiRequest::delete(format!("/datasets/{}", dataset_id)))
            .await
            .map_err(|e| e.at_call_site(DATASET_NOT_FOUND, "Failed to delete dataset"))?;
        info!(dataset_id, "Dataset deleted");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_mime_type() {
        assert_eq!(upload_mime_type(Path::new("a.csv")), "text/csv");
        assert_eq!(upload_mime_type(Path::new("A.CSV")), "text/csv");
        assert_eq!(upload_mime_type(Path::new("b.xls")), "application/vnd.ms-excel");
        assert!(upload_mime_type(Path::new("c.xlsx")).contains("spreadsheetml"));
        assert_eq!(upload_mime_type(Path::new("noext")), "application/octet-stream");
    }
}
