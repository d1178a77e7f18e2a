//! Data models for InsightX backend responses.
//!
//! - `UserProfile`, `LoginResponse`, `RegisterResponse`: authentication
//! - `DatasetInfo`, `UploadResponse`, `DatasetPreview`: dataset management
//! - `AnalyticsSummary`, `CorrelationAnalysis`, `OutlierAnalysis`: precomputed
//!   analytics, consumed as-is

pub mod analytics;
pub mod dataset;
pub mod user;

pub use analytics::{
    AnalyticsSummary, CategoricalStats, ColumnProfile, ColumnStatistics, CorrelationAnalysis,
    CorrelationPair, CorrelationSummary, DatasetDashboard, HealthReport, OutlierAnalysis,
    OutlierSummary, SummaryInfo, TopValue,
};
pub use dataset::{DatasetInfo, DatasetPreview, UploadResponse};
pub use user::{LoginResponse, MessageResponse, RefreshResponse, RegisterResponse, UserProfile};
