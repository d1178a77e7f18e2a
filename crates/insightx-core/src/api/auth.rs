//! Login, registration and logout.

use serde_json::json;
use tracing::{info, warn};

use crate::auth::SessionEndReason;
use crate::models::{LoginResponse, RegisterResponse};
use crate::validation;

use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Log in and store the returned credentials for this session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let email = validation::validate_login(email, password)?;

        let request = ApiRequest::post("/auth/login")
            .form(vec![
                ("username".to_string(), email),
                ("password".to_string(), password.to_string()),
            ])
            .anonymous();

        let response: LoginResponse = self.send(request).await.map_err(|e| {
            warn!(error = %e, "Login failed");
            match e {
                ApiError::AuthFailed(_) => ApiError::AuthFailed("Invalid email or password".to_string()),
                ApiError::Status { status: 423, .. } => {
                    ApiError::Unknown("Account temporarily locked. Please try again later.".to_string())
                }
                e if e.is_transport() => e,
                _ => ApiError::Unknown("Login failed. Please try again.".to_string()),
            }
        })?;

        // Nothing from a previous session survives a new login
        self.store().clear();
        self.store().save(
            &response.access_token,
            response.refresh_token.as_deref(),
            Some(&response.user),
        );
        info!("Login successful");
        Ok(response)
    }

    /// Create an account. Does not log in.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterResponse, ApiError> {
        let (name, email) = validation::validate_registration(name, email, password)?;

        let request = ApiRequest::post("/auth/register")
            .json(json!({
                "name": name,
                "email": email,
                "password": password,
            }))
            .anonymous();

        self.send(request).await.map_err(|e| {
            warn!(error = %e, "Registration failed");
            match e {
                ApiError::Status { status: 400, ref body } => match ApiError::detail_message(body) {
                    Some(detail) => ApiError::Validation(detail),
                    None => ApiError::Unknown("Registration failed. Please try again.".to_string()),
                },
                e if e.is_transport() => e,
                _ => ApiError::Unknown("Registration failed. Please try again.".to_string()),
            }
        })
    }

    /// Revoke the session on the server (best effort) and clear it locally.
    pub async fn logout(&self) {
        let store = self.store();
        let live = store
            .get_access_token()
            .is_some_and(|token| !store.is_access_token_expired(&token));
        if live {
            let request = ApiRequest::post("/auth/logout")
                .json(json!({ "refresh_token": store.get_refresh_token() }));
            if let Err(e) = self.execute(request).await {
                warn!(error = %e, "Server logout failed, clearing local session anyway");
            }
        }
        store.end_session(SessionEndReason::LoggedOut);
        info!("Logged out");
    }
}
