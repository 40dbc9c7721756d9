//! Blog API client for the credential renewal endpoint.
//!
//! POST `{base_url}{refresh_path}` with `{"refresh_token": ...}` (plus
//! `"user_id"` when the deployment wants the subject echoed back) and read
//! a [`RenewalGrant`] out of the response.

use async_trait::async_trait;

use crate::adapters::ReqwestHttpClient;
use crate::error::AuthError;
use crate::traits::{Headers, HttpClient, RenewalEndpoint, RenewalGrant, RenewalRequest};

/// Default URL for the blog API
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default path of the renewal endpoint
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Client for the blog API's authentication endpoints.
pub struct AuthApiClient<C: HttpClient = ReqwestHttpClient> {
    /// Base URL for the blog API
    pub base_url: String,
    refresh_path: String,
    send_subject: bool,
    http: C,
}

impl AuthApiClient<ReqwestHttpClient> {
    /// Create a client against `base_url` using reqwest.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, ReqwestHttpClient::new())
    }
}

impl<C: HttpClient> AuthApiClient<C> {
    /// Create a client with an injected HTTP implementation.
    pub fn with_http(base_url: impl Into<String>, http: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            send_subject: false,
            http,
        }
    }

    /// Override the renewal endpoint path.
    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.refresh_path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Include the decoded subject in renewal requests.
    pub fn with_send_subject(mut self, send: bool) -> Self {
        self.send_subject = send;
        self
    }

    pub fn refresh_url(&self) -> String {
        format!("{}{}", self.base_url, self.refresh_path)
    }

    pub fn http(&self) -> &C {
        &self.http
    }

    /// Refresh an access token using a refresh token.
    pub async fn refresh_token(&self, request: &RenewalRequest) -> Result<RenewalGrant, AuthError> {
        let mut body = serde_json::json!({
            "refresh_token": request.refresh_token,
        });
        if self.send_subject {
            if let Some(subject) = &request.subject {
                body["user_id"] = serde_json::Value::String(subject.clone());
            }
        }

        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());

        let url = self.refresh_url();
        let response = self
            .http
            .post_json(&url, &body, &headers)
            .await
            .map_err(|e| AuthError::RefreshFailed {
                message: e.to_string(),
            })?;

        if !response.is_success() {
            let status = response.status;
            let message = truncate(&response.text_lossy(), 200);
            return Err(match status {
                400 | 401 | 403 => AuthError::RefreshRejected { status, message },
                _ => AuthError::RefreshFailed {
                    message: format!("server returned {}: {}", status, message),
                },
            });
        }

        response
            .json::<RenewalGrant>()
            .map_err(|e| AuthError::InvalidResponse {
                message: format!("failed to parse renewal response: {}", e),
            })
    }
}

#[async_trait]
impl<C: HttpClient> RenewalEndpoint for AuthApiClient<C> {
    async fn renew(&self, request: &RenewalRequest) -> Result<RenewalGrant, AuthError> {
        tracing::debug!("Requesting credential renewal from {}", self.refresh_url());
        self.refresh_token(request).await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
