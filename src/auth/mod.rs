//! Sessions and the external authentication backend.
//!
//! The auth backend owns users and tokens. This module only knows how to
//! carry its tokens in a cookie and which calls to make:
//!
//! ```text
//! cookie ──decode──► SessionTokens ──expired?──► AuthBackend::refresh
//!                                   └─fresh────► AuthBackend::user
//! ```
//!
//! The cookie value is `base64-` followed by the unpadded base64url encoding
//! of the token JSON, so it never needs quoting.

mod gotrue;

use std::fmt;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::cookie::{Cookie, SameSite};

pub use gotrue::GoTrueClient;

const COOKIE_PREFIX: &str = "base64-";

/// An authenticated user as reported by the auth backend.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The token pair stored in the session cookie.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds at which `access_token` stops being accepted.
    pub expires_at: i64,
}

impl SessionTokens {
    /// `true` once `now` is within `margin` seconds of expiry.
    pub fn is_expired(&self, now: i64, margin: i64) -> bool {
        self.expires_at <= now.saturating_add(margin)
    }

    /// Encodes for use as a cookie value.
    pub fn to_cookie_value(&self) -> Result<String, AuthError> {
        let json = serde_json::to_vec(self).map_err(|e| AuthError::Decode(e.to_string()))?;
        Ok(format!("{COOKIE_PREFIX}{}", URL_SAFE_NO_PAD.encode(json)))
    }

    /// Decodes a cookie value produced by [`to_cookie_value`](Self::to_cookie_value).
    pub fn from_cookie_value(value: &str) -> Result<Self, AuthError> {
        let encoded = value
            .strip_prefix(COOKIE_PREFIX)
            .ok_or_else(|| AuthError::Decode("missing base64- prefix".to_owned()))?;
        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| AuthError::Decode(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| AuthError::Decode(e.to_string()))
    }
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The `Set-Cookie` that stores `tokens` as the session.
pub fn session_cookie(config: &SessionConfig, tokens: &SessionTokens) -> Result<Cookie, AuthError> {
    Ok(Cookie::new(&config.cookie_name, tokens.to_cookie_value()?)
        .path("/")
        .max_age(config.cookie_max_age_secs)
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax))
}

/// The `Set-Cookie` that ends the session on the client.
pub fn clear_session_cookie(config: &SessionConfig) -> Cookie {
    Cookie::removal(&config.cookie_name)
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
}

/// Authentication state of one request, attached by the session stage.
#[derive(Clone, Debug, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated { user: User, tokens: SessionTokens },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            Self::Anonymous => None,
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        match self {
            Self::Authenticated { tokens, .. } => Some(tokens.access_token.as_str()),
            Self::Anonymous => None,
        }
    }
}

/// Tokens plus the user they belong to, as returned by a token grant.
#[derive(Clone, Debug)]
pub struct Grant {
    pub tokens: SessionTokens,
    pub user: User,
}

/// Errors from the auth backend or the session cookie.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The backend understood the request and said no: bad credentials,
    /// revoked or expired token.
    #[error("rejected by auth backend: {0}")]
    Rejected(String),

    /// The backend could not be reached or answered unexpectedly.
    #[error("auth backend unavailable: {0}")]
    Transport(String),

    #[error("malformed session data: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// The external authentication service.
#[async_trait]
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges a refresh token for a new token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<Grant, AuthError>;

    /// Validates an access token and returns its user.
    async fn user(&self, access_token: &str) -> Result<User, AuthError>;

    /// Password sign-in.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Grant, AuthError>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}
