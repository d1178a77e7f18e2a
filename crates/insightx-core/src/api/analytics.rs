//! Precomputed analytics for a dataset.

use tracing::{debug, info};

use crate::models::{AnalyticsSummary, CorrelationAnalysis, DatasetDashboard, OutlierAnalysis};
use crate::validation;

use super::{ApiClient, ApiError, ApiRequest};

const DATASET_NOT_FOUND: &str = "Dataset not found";

impl ApiClient {
    pub async fn analytics_summary(&self, dataset_id: &str) -> Result<AnalyticsSummary, ApiError> {
        validation::validate_dataset_id(dataset_id)?;
        self.send(ApiRequest::get(format!("/analytics/{}/summary", dataset_id)))
            .await
            .map_err(|e| e.at_call_site(DATASET_NOT_FOUND, "Failed to load analytics"))
    }

    pub async fn correlation_analysis(&self, dataset_id: &str) -> Result<CorrelationAnalysis, ApiError> {
        validation::validate_dataset_id(dataset_id)?;
        self.send(ApiRequest::get(format!("/analytics/{}/correlation", dataset_id)))
            .await
            .map_err(|e| e.at_call_site(DATASET_NOT_FOUND, "Failed to load correlation analysis"))
    }

    pub async fn outlier_analysis(&self, dataset_id: &str) -> Result<OutlierAnalysis, ApiError> {
        validation::validate_dataset_id(dataset_id)?;
        self.send(ApiRequest::get(format!("/analytics/{}/outliers", dataset_id)))
            .await
            .map_err(|e| e.at_call_site(DATASET_NOT_FOUND, "Failed to load outlier analysis"))
    }

    /// Drop the server's cached analytics and recompute them.
    pub async fn refresh_analytics(&self, dataset_id: &str) -> Result<AnalyticsSummary, ApiError> {
        validation::validate_dataset_id(dataset_id)?;
        let summary = self
            .send(ApiRequest::post(format!("/analytics/{}/refresh", dataset_id)))
            .await
            .map_err(|e| e.at_call_site(DATASET_NOT_FOUND, "Failed to refresh analytics cache"))?;
        info!(dataset_id, "Analytics recomputed");
        Ok(summary)
    }

    /// Fetch summary, correlation and outlier analysis concurrently.
    /// Fails as soon as any of the three fails.
    pub async fn dataset_dashboard(&self, dataset_id: &str) -> Result<DatasetDashboard, ApiError> {
        validation::validate_dataset_id(dataset_id)?;
        let (summary, correlation, outliers) = futures::try_join!(
            self.analytics_summary(dataset_id),
            self.correlation_analysis(dataset_id),
            self.outlier_analysis(dataset_id),
        )?;
        debug!(dataset_id, "Dashboard loaded");
        Ok(DatasetDashboard {
            summary,
            correlation,
            outliers,
        })
    }
}
