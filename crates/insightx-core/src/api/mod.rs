//! REST API client module for the InsightX backend.
//!
//! This module provides the `ApiClient` for authenticating, managing
//! datasets and fetching precomputed analytics.
//!
//! The API uses JWT bearer tokens obtained from `/auth/login` and renewed
//! through `/auth/refresh`; see `client` for the retry rules.

pub mod analytics;
pub mod auth;
pub mod client;
pub mod datasets;
pub mod error;

pub use client::{ApiClient, ApiRequest, RequestBody, UploadFile};
pub use error::ApiError;
