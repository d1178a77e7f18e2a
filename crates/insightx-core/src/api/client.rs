//! Authenticated request client for the InsightX backend.
//!
//! Every call goes through `ApiClient::execute`, which:
//! 1. refuses to send anything once the stored access token has expired,
//! 2. attaches the bearer token and the `X-Requested-With` marker,
//! 3. on a 401, refreshes the access token once and resends the request,
//! 4. normalizes transport failures (network, 429, 5xx) into generic errors.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, multipart, Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::auth::{SessionEndReason, TokenStore};
use crate::config::Config;
use crate::models::RefreshResponse;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Marker header identifying programmatic calls
const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

const REFRESH_PATH: &str = "/auth/refresh";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Dataset upload timeout in seconds.
const UPLOAD_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Request description
// ============================================================================

/// A file attached to a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    fn to_form(&self) -> Result<multipart::Form, ApiError> {
        let part = multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.mime_type)
            .map_err(|e| ApiError::Validation(format!("Invalid upload content type: {}", e)))?;
        Ok(multipart::Form::new().part("file", part))
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
    File(UploadFile),
}

/// Description of one logical API call.
///
/// The value is rebuilt into an HTTP request for every attempt, so a retried
/// call resends exactly what the caller asked for. `retried` is set on the
/// copy used for the single post-refresh attempt.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: RequestBody,
    timeout: Option<Duration>,
    anonymous: bool,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            timeout: None,
            anonymous: false,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    pub fn file(mut self, file: UploadFile) -> Self {
        self.body = RequestBody::File(file);
        self
    }

    /// Override the client's default timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send without credentials: no expiry check, no bearer token, and a 401
    /// is final. Used for the endpoints that issue credentials.
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// API client for the InsightX backend.
/// Clone is cheap - reqwest::Client and TokenStore share their state.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: TokenStore,
    upload_timeout: Duration,
}

impl ApiClient {
    /// Create a client for the endpoint resolved from `config`.
    pub fn new(config: &Config, store: TokenStore) -> Result<Self> {
        Self::build(
            config.base_url(),
            store,
            config.request_timeout(),
            config.upload_timeout(),
        )
    }

    /// Create a client for an explicit base URL with default timeouts.
    pub fn with_base_url(base_url: impl Into<String>, store: TokenStore) -> Result<Self> {
        Self::build(
            base_url.into(),
            store,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            Duration::from_secs(UPLOAD_TIMEOUT_SECS),
        )
    }

    fn build(
        base_url: String,
        store: TokenStore,
        request_timeout: Duration,
        upload_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        let base_url = base_url.trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "API client created");
        Ok(Self {
            client,
            base_url,
            store,
            upload_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    /// Execute a request and decode its JSON body.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.execute(request).await?;
        let bytes = response.bytes().await.map_err(ApiError::Network)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!(path = %path, error = %e, "Failed to parse response body");
            ApiError::InvalidResponse(format!("{}: {}", path, e))
        })
    }

    /// Execute a request, returning the successful response untouched.
    ///
    /// A request is sent at most twice: once normally and, after a 401 and a
    /// successful token refresh, once more with the new token.
    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut request = request;
        let mut token = if request.anonymous {
            None
        } else {
            self.preflight()?
        };

        loop {
            match self.dispatch(&request, token.as_deref()).await {
                Err(err @ ApiError::AuthFailed(_)) if !request.anonymous && !request.retried => {
                    debug!(path = %request.path, "Unauthorized, attempting token refresh");
                    request = request.into_retry();
                    token = Some(self.refresh_access_token(err).await?);
                }
                result => return result,
            }
        }
    }

    /// Returns the token to attach, or ends the session if it has expired.
    fn preflight(&self) -> Result<Option<String>, ApiError> {
        match self.store.get_access_token() {
            Some(token) if self.store.is_access_token_expired(&token) => {
                warn!("Access token expired, logging out");
                self.store.end_session(SessionEndReason::Expired);
                Err(ApiError::Unauthenticated)
            }
            token => Ok(token),
        }
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(
            method = %request.method,
            path = %request.path,
            retried = request.retried,
            authenticated = token.is_some(),
            "Sending request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(ref body) => builder.json(body),
            RequestBody::Form(ref fields) => builder.form(fields),
            RequestBody::File(ref file) => builder.multipart(file.to_form()?),
        };

        let response = builder.send().await.map_err(|e| {
            warn!(path = %request.path, timeout = e.is_timeout(), error = %e, "Request failed without a response");
            ApiError::Network(e)
        })?;

        Self::check_response(response).await
    }

    /// Check if response is successful, returning a mapped error if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let path = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            warn!(path = %path, retry_after = ?retry_after, "Rate limited");
        } else if status.is_server_error() {
            warn!(path = %path, status = status.as_u16(), "Server error");
            debug!(body = %ApiError::truncate_body(&body), "Server error body");
        } else {
            debug!(
                path = %path,
                status = status.as_u16(),
                body = %ApiError::truncate_body(&body),
                "Request rejected"
            );
        }

        Err(ApiError::from_status(status, &body, retry_after))
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Without a refresh token the session ends and `original` is returned.
    /// If the refresh itself fails the session ends and that failure is
    /// returned. A token that arrives after the session was ended or replaced
    /// is dropped.
    async fn refresh_access_token(&self, original: ApiError) -> Result<String, ApiError> {
        let Some(refresh_token) = self.store.get_refresh_token() else {
            warn!("No refresh token available, ending session");
            self.store.end_session(SessionEndReason::Unauthorized);
            return Err(original);
        };

        let request = ApiRequest::post(REFRESH_PATH)
            .json(json!({ "refresh_token": refresh_token }))
            .anonymous();

        let refreshed = match self.dispatch(&request, None).await {
            Ok(response) => match response.json::<RefreshResponse>().await {
                Ok(body) => Ok(body.access_token),
                Err(e) => Err(ApiError::InvalidResponse(format!("{}: {}", REFRESH_PATH, e))),
            },
            Err(e) => Err(e),
        };

        match refreshed {
            Ok(access_token) => {
                // The session may have ended while the refresh was in flight
                if self.store.get_refresh_token().as_deref() == Some(refresh_token.as_str()) {
                    self.store.save(&access_token, None, None);
                    debug!("Access token refreshed");
                    Ok(access_token)
                } else {
                    debug!("Session ended during refresh, discarding new access token");
                    Err(ApiError::Unauthenticated)
                }
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed");
                self.store.end_session(SessionEndReason::RefreshFailed);
                Err(e)
            }
        }
    }
}
