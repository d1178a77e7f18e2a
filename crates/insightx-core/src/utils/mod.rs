//! Utility functions for display formatting.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_bytes, format_count, format_date, format_metric, truncate_string};
