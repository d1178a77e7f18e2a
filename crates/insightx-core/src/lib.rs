//! Core library for the InsightX analytics client.
//!
//! - `auth`: session token store, JWT expiry checks, expiry watcher
//! - `api`: authenticated request client and typed endpoint wrappers
//! - `models`: response types returned by the InsightX backend
//! - `insights`: narrative insights derived from analytics summaries
//! - `export`: HTML/CSV/Excel/JSON report generation
//! - `config`: configuration loading and base endpoint resolution

pub mod api;
pub mod auth;
pub mod config;
pub mod export;
pub mod insights;
pub mod models;
pub mod utils;
pub mod validation;

pub use api::{ApiClient, ApiError};
pub use auth::{ExpiryWatcher, MemoryStorage, SessionEndReason, SessionEvent, SessionStorage, TokenStore};
pub use config::Config;
