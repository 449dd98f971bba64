//! Session refresh stage.
//!
//! Reads the auth cookie, asks the auth backend whether it is still good,
//! renews it when it is about to expire, and records the result as a
//! [`Session`] in the request's extensions. Backend trouble never escapes:
//! it degrades to an anonymous session and the pages decide what to do.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::{Outcome, Stage};
use crate::auth::{self, AuthBackend, AuthError, Session, SessionTokens};
use crate::config::SessionConfig;
use crate::request::Request;

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Validates and refreshes the session carried in the auth cookie.
#[derive(Clone)]
pub struct SessionRefresher {
    auth: Arc<dyn AuthBackend>,
    config: SessionConfig,
    clock: Clock,
}

impl SessionRefresher {
    pub fn new(auth: Arc<dyn AuthBackend>, config: SessionConfig) -> Self {
        Self { auth, config, clock: Arc::new(|| Utc::now().timestamp()) }
    }

    /// Replaces the wall clock (unix seconds).
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    async fn revalidate(&self, tokens: SessionTokens, outcome: &mut Outcome) -> Session {
        let now = (self.clock)();

        if !tokens.is_expired(now, self.config.refresh_margin_secs) {
            match self.auth.user(&tokens.access_token).await {
                Ok(user) => return Session::Authenticated { user, tokens },
                Err(AuthError::Rejected(reason)) => {
                    debug!(%reason, "access token rejected, attempting refresh");
                }
                Err(e) => {
                    warn!(error = %e, "session validation failed, continuing anonymously");
                    return Session::Anonymous;
                }
            }
        }

        match self.auth.refresh(&tokens.refresh_token).await {
            Ok(grant) => match auth::session_cookie(&self.config, &grant.tokens) {
                Ok(cookie) => {
                    debug!(user_id = %grant.user.id, expires_at = grant.tokens.expires_at, "session refreshed");
                    outcome.set_cookie(cookie);
                    Session::Authenticated { user: grant.user, tokens: grant.tokens }
                }
                Err(e) => {
                    warn!(error = %e, "could not encode refreshed session");
                    Session::Anonymous
                }
            },
            Err(AuthError::Rejected(reason)) => {
                debug!(%reason, "refresh token rejected, clearing session");
                outcome.set_cookie(auth::clear_session_cookie(&self.config));
                Session::Anonymous
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed, continuing anonymously");
                Session::Anonymous
            }
        }
    }
}

#[async_trait]
impl Stage for SessionRefresher {
    fn name(&self) -> &'static str { "session" }

    async fn apply(&self, req: &mut Request, mut outcome: Outcome) -> Outcome {
        let decoded = req.cookie(&self.config.cookie_name).map(SessionTokens::from_cookie_value);

        let session = match decoded {
            None => Session::Anonymous,
            Some(Ok(tokens)) => self.revalidate(tokens, &mut outcome).await,
            Some(Err(e)) => {
                debug!(error = %e, "discarding malformed session cookie");
                outcome.set_cookie(auth::clear_session_cookie(&self.config));
                Session::Anonymous
            }
        };

        req.extensions_mut().insert(session);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::auth::{Grant, User};
    use crate::cookie::Cookie;
    use crate::Method;

    const NOW: i64 = 1_000_000;

    /// Scripted backend: each call pops the next canned answer.
    #[derive(Default)]
    struct Scripted {
        user: Mutex<Vec<Result<User, AuthError>>>,
        refresh: Mutex<Vec<Result<Grant, AuthError>>>,
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl AuthBackend for Scripted {
        async fn refresh(&self, _refresh_token: &str) -> Result<Grant, AuthError> {
            self.calls.lock().unwrap().push("refresh");
            self.refresh.lock().unwrap().pop().unwrap_or(Err(AuthError::Transport("unscripted".into())))
        }

        async fn user(&self, _access_token: &str) -> Result<User, AuthError> {
            self.calls.lock().unwrap().push("user");
            self.user.lock().unwrap().pop().unwrap_or(Err(AuthError::Transport("unscripted".into())))
        }

        async fn sign_in(&self, _email: &str, _password: &str) -> Result<Grant, AuthError> {
            unreachable!()
        }

        async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
            unreachable!()
        }
    }

    fn user() -> User {
        User { id: "user-1".to_owned(), email: Some("ana@example.com".to_owned()) }
    }

    fn tokens(suffix: &str, expires_at: i64) -> SessionTokens {
        SessionTokens {
            access_token: format!("at-{suffix}"),
            refresh_token: format!("rt-{suffix}"),
            expires_at,
        }
    }

    fn request_with(tokens: &SessionTokens) -> Request {
        let cookie = format!("sb-auth-token={}", tokens.to_cookie_value().unwrap());
        Request::new(Method::Get, "/en/profile".parse().unwrap()).with_header("cookie", &cookie)
    }

    fn stage(backend: &Arc<Scripted>) -> SessionRefresher {
        let auth: Arc<dyn AuthBackend> = backend.clone();
        SessionRefresher::new(auth, SessionConfig::default()).with_clock(|| NOW)
    }

    #[tokio::test]
    async fn no_cookie_is_anonymous_without_backend_call() {
        let backend = Arc::new(Scripted::default());
        let mut req = Request::new(Method::Get, "/en/events".parse().unwrap());
        let outcome = stage(&backend).apply(&mut req, Outcome::next()).await;

        assert!(!req.session().is_authenticated());
        assert!(outcome.cookies().is_empty());
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fresh_token_is_validated_not_refreshed() {
        let backend = Arc::new(Scripted::default());
        backend.user.lock().unwrap().push(Ok(user()));
        let mut req = request_with(&tokens("old", NOW + 3600));

        let outcome = stage(&backend).apply(&mut req, Outcome::next()).await;

        assert_eq!(req.user(), Some(&user()));
        assert!(outcome.cookies().is_empty());
        assert_eq!(*backend.calls.lock().unwrap(), ["user"]);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_cookie_renewed() {
        let backend = Arc::new(Scripted::default());
        backend.refresh.lock().unwrap().push(Ok(Grant { tokens: tokens("new", NOW + 3600), user: user() }));
        let mut req = request_with(&tokens("old", NOW - 10));

        let outcome = stage(&backend).apply(&mut req, Outcome::next()).await;

        assert_eq!(*backend.calls.lock().unwrap(), ["refresh"]);
        let cookie = outcome.cookie("sb-auth-token").unwrap();
        assert_eq!(SessionTokens::from_cookie_value(cookie.value()).unwrap(), tokens("new", NOW + 3600));
        assert_eq!(req.session().access_token(), Some("at-new"));
    }

    #[tokio::test]
    async fn token_inside_margin_counts_as_expired() {
        let backend = Arc::new(Scripted::default());
        backend.refresh.lock().unwrap().push(Ok(Grant { tokens: tokens("new", NOW + 3600), user: user() }));
        let mut req = request_with(&tokens("old", NOW + 5));

        stage(&backend).apply(&mut req, Outcome::next()).await;
        assert_eq!(*backend.calls.lock().unwrap(), ["refresh"]);
    }

    #[tokio::test]
    async fn rejected_access_token_falls_back_to_refresh() {
        let backend = Arc::new(Scripted::default());
        backend.user.lock().unwrap().push(Err(AuthError::Rejected("bad jwt".into())));
        backend.refresh.lock().unwrap().push(Ok(Grant { tokens: tokens("new", NOW + 3600), user: user() }));
        let mut req = request_with(&tokens("old", NOW + 3600));

        let outcome = stage(&backend).apply(&mut req, Outcome::next()).await;

        assert_eq!(*backend.calls.lock().unwrap(), ["user", "refresh"]);
        assert!(req.session().is_authenticated());
        assert!(outcome.cookie("sb-auth-token").is_some());
    }

    #[tokio::test]
    async fn rejected_refresh_clears_cookie() {
        let backend = Arc::new(Scripted::default());
        backend.refresh.lock().unwrap().push(Err(AuthError::Rejected("revoked".into())));
        let mut req = request_with(&tokens("old", NOW - 10));

        let outcome = stage(&backend).apply(&mut req, Outcome::next()).await;

        assert!(!req.session().is_authenticated());
        assert!(outcome.cookie("sb-auth-token").is_some_and(Cookie::is_removal));
    }

    #[tokio::test]
    async fn unreachable_backend_is_anonymous_and_keeps_cookie() {
        let backend = Arc::new(Scripted::default());
        let mut req = request_with(&tokens("old", NOW - 10));

        let outcome = stage(&backend).apply(&mut req, Outcome::next()).await;

        assert!(!req.session().is_authenticated());
        assert!(outcome.cookies().is_empty());
    }

    #[tokio::test]
    async fn malformed_cookie_is_cleared() {
        let backend = Arc::new(Scripted::default());
        let mut req = Request::new(Method::Get, "/en/profile".parse().unwrap())
            .with_header("cookie", "sb-auth-token=garbage");

        let outcome = stage(&backend).apply(&mut req, Outcome::next()).await;

        assert!(outcome.cookie("sb-auth-token").is_some_and(Cookie::is_removal));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn preserves_earlier_redirect_and_cookies() {
        let backend = Arc::new(Scripted::default());
        backend.refresh.lock().unwrap().push(Ok(Grant { tokens: tokens("new", NOW + 3600), user: user() }));
        let mut req = request_with(&tokens("old", NOW - 10));

        let mut earlier = Outcome::next();
        earlier.set_cookie(Cookie::new("locale", "en"));
        let earlier = earlier.redirect(crate::Status::TemporaryRedirect, "/en/profile");

        let outcome = stage(&backend).apply(&mut req, earlier).await;

        assert!(outcome.is_redirect());
        assert!(outcome.cookie("locale").is_some());
        assert!(outcome.cookie("sb-auth-token").is_some());
    }
}
