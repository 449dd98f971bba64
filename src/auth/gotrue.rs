//! HTTP client for a GoTrue-compatible auth service (`/auth/v1/*`).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{AuthBackend, AuthError, Grant, SessionTokens, User};
use crate::USER_AGENT;

/// Talks to the hosted auth service.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Clone, Debug)]
pub struct GoTrueClient {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GoTrueClient {
    /// Builds a client with its own connection pool and request timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().user_agent(USER_AGENT).timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, api_key))
    }

    /// Reuses an existing `reqwest` client.
    pub fn with_client(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url, api_key: api_key.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path)).header("apikey", &self.api_key)
    }

    async fn token(&self, grant_type: &str, body: serde_json::Value) -> Result<Grant, AuthError> {
        let res = self
            .post("token")
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;
        let res = check(res).await?;
        let token: TokenResponse = res.json().await?;

        let expires_at = token
            .expires_at
            .or_else(|| token.expires_in.map(|secs| Utc::now().timestamp() + secs))
            .ok_or_else(|| AuthError::Decode("token response has no expiry".to_owned()))?;

        debug!(user_id = %token.user.id, grant_type, "token granted");
        Ok(Grant {
            tokens: SessionTokens {
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                expires_at,
            },
            user: token.user,
        })
    }
}

/// Maps non-success statuses onto [`AuthError`]. Client errors are the
/// backend's verdict; everything else means it could not give one.
async fn check(res: reqwest::Response) -> Result<reqwest::Response, AuthError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body: ErrorBody = res.json().await.unwrap_or_default();
    let detail = body
        .error_description
        .or(body.msg)
        .or(body.message)
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::UNAUTHORIZED
        | StatusCode::FORBIDDEN
        | StatusCode::NOT_FOUND
        | StatusCode::UNPROCESSABLE_ENTITY => Err(AuthError::Rejected(detail)),
        _ => Err(AuthError::Transport(detail)),
    }
}

#[async_trait]
impl AuthBackend for GoTrueClient {
    async fn refresh(&self, refresh_token: &str) -> Result<Grant, AuthError> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token })).await
    }

    async fn user(&self, access_token: &str) -> Result<User, AuthError> {
        let res = self
            .http
            .get(self.url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(check(res).await?.json().await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Grant, AuthError> {
        self.token("password", json!({ "email": email, "password": password })).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let res = self.post("logout").bearer_auth(access_token).send().await?;
        check(res).await?;
        Ok(())
    }
}
