//! Client-side input checks, run before any request is sent.
//!
//! Every failure is an `ApiError::Validation` with a message fit for display.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::api::ApiError;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Largest dataset the backend accepts (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

static DATASET_ID: OnceLock<Regex> = OnceLock::new();
static EMAIL: OnceLock<Regex> = OnceLock::new();

fn dataset_id_regex() -> &'static Regex {
    DATASET_ID.get_or_init(|| {
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
            .expect("dataset id pattern is valid")
    })
}

fn email_regex() -> &'static Regex {
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"))
}

/// Dataset identifiers are RFC 4122 UUIDs (versions 1-5).
pub fn validate_dataset_id(id: &str) -> Result<(), ApiError> {
    if dataset_id_regex().is_match(id) {
        Ok(())
    } else {
        Err(ApiError::Validation("Invalid dataset ID".to_string()))
    }
}

/// Check login input. Returns the normalized (trimmed, lower-cased) email.
pub fn validate_login(email: &str, password: &str) -> Result<String, ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation("Email and password are required".to_string()));
    }
    if email.chars().count() > MAX_EMAIL_LEN || password.chars().count() > MAX_PASSWORD_LEN {
        return Err(ApiError::Validation("Invalid input length".to_string()));
    }
    Ok(normalize_email(email))
}

/// Check registration input. Returns the trimmed name and normalized email.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
) -> Result<(String, String), ApiError> {
    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::Validation("All fields are required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN
        || email.chars().count() > MAX_EMAIL_LEN
        || password.chars().count() > MAX_PASSWORD_LEN
    {
        return Err(ApiError::Validation("Input too long".to_string()));
    }
    if !email_regex().is_match(email.trim()) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    Ok((name.trim().to_string(), normalize_email(email)))
}

/// Check a dataset file's name and size before uploading it.
pub fn validate_upload(path: &Path, size: u64) -> Result<(), ApiError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(ApiError::Validation(
            "File too large. Maximum size is 10MB.".to_string(),
        ));
    }
    let allowed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ALLOWED_UPLOAD_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false);
    if !allowed {
        return Err(ApiError::Validation(
            "Invalid file type. Only CSV and Excel files are allowed.".to_string(),
        ));
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
