//! Site pages.
//!
//! Every page lives under `/{locale}` and renders JSON for the front end.
//! Handlers are plain `async fn(Arc<App>, Request) -> impl IntoResponse`;
//! [`routes`] binds them to the shared [`App`] state. Signed-in pages return
//! `Result<Response, Response>` and leave early with `require_user(&req)?`.

mod account;
mod events;

use std::future::Future;
use std::sync::Arc;

use crate::auth::{AuthBackend, User};
use crate::config::Config;
use crate::data::DataBackend;
use crate::{Handler, IntoResponse, Locale, Method, Request, Response, Router, Status, health};

/// Shared, immutable state behind every page.
pub struct App {
    pub auth: Arc<dyn AuthBackend>,
    pub data: Arc<dyn DataBackend>,
    pub config: Config,
}

impl App {
    pub fn new(auth: Arc<dyn AuthBackend>, data: Arc<dyn DataBackend>, config: Config) -> Self {
        Self { auth, data, config }
    }
}

/// The site's route table.
pub fn routes(app: Arc<App>) -> Router {
    Router::new()
        .on(Method::Get, "/healthz", health::liveness)
        .on(Method::Get, "/readyz", bind(&app, |app, _req| async move { health::readiness(app.data.as_ref()).await }))
        .on(Method::Get, "/{locale}", bind(&app, events::list))
        .on(Method::Get, "/{locale}/events", bind(&app, events::list))
        .on(Method::Get, "/{locale}/events/{slug}", bind(&app, events::show))
        .on(Method::Get, "/{locale}/login", bind(&app, account::login_page))
        .on(Method::Post, "/{locale}/login", bind(&app, account::login))
        .on(Method::Post, "/{locale}/logout", bind(&app, account::logout))
        .on(Method::Get, "/{locale}/profile", bind(&app, account::profile))
        .on(Method::Get, "/{locale}/my-events", bind(&app, account::my_events))
        .on(Method::Post, "/{locale}/my-events", bind(&app, account::create_event))
        .on(Method::Get, "/{locale}/my-events/create", bind(&app, account::create_form))
}

/// Closes a state-taking page over `app`.
///
/// Paths that skipped the pipeline can still match `/{locale}`; a segment
/// that is not a supported locale is a 404 rather than a page.
fn bind<F, Fut, R>(app: &Arc<App>, page: F) -> impl Handler
where
    F: Fn(Arc<App>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    let app = Arc::clone(app);
    let page = Arc::new(page);
    move |req: Request| {
        let app = Arc::clone(&app);
        let page = Arc::clone(&page);
        async move {
            if req.param("locale").is_some_and(|l| l.parse::<Locale>().is_err()) {
                return Status::NotFound.into_response();
            }
            (*page)(app, req).await.into_response()
        }
    }
}

/// The signed-in user and their access token, or a `303` to the login page
/// that comes back to this path and query afterwards.
fn require_user(req: &Request) -> Result<(&User, &str), Response> {
    let session = req.session();
    match (session.user(), session.access_token()) {
        (Some(user), Some(token)) => Ok((user, token)),
        _ => {
            let back = match req.query() {
                Some(query) => format!("{}?{query}", req.path()),
                None => req.path().to_owned(),
            };
            let location = format!("/{}/login?next={}", req.locale(), urlencoding::encode(&back));
            Err(Response::redirect(Status::SeeOther, &location))
        }
    }
}

/// `next` if it is a local path, so a crafted link cannot bounce the user
/// to another site after login.
fn local_target(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_user_is_sent_to_login_with_next() {
        let mut req = Request::new(Method::Get, "/es/my-events/create".parse().unwrap());
        req.extensions_mut().insert(Locale::Es);

        let Err(res) = require_user(&req) else { panic!("expected redirect") };
        assert_eq!(res.status_code(), Status::SeeOther);
        assert_eq!(res.header("location"), Some("/es/login?next=%2Fes%2Fmy-events%2Fcreate"));
    }

    #[test]
    fn next_keeps_the_query_and_survives_decoding() {
        let mut req = Request::new(Method::Get, "/en/my-events?tag=a%26b&page=2".parse().unwrap());
        req.extensions_mut().insert(Locale::En);

        let Err(res) = require_user(&req) else { panic!("expected redirect") };
        let location = res.header("location").unwrap();
        assert_eq!(location, "/en/login?next=%2Fen%2Fmy-events%3Ftag%3Da%2526b%26page%3D2");

        let login = Request::new(Method::Get, location.parse().unwrap());
        let next = login.query_param("next");
        assert_eq!(next.as_deref(), Some("/en/my-events?tag=a%26b&page=2"));
        assert_eq!(local_target(next.as_deref()), Some("/en/my-events?tag=a%26b&page=2"));
    }

    #[test]
    fn only_local_targets_are_followed() {
        assert_eq!(local_target(Some("/en/profile")), Some("/en/profile"));
        assert_eq!(local_target(Some("//evil.example")), None);
        assert_eq!(local_target(Some("https://evil.example")), None);
        assert_eq!(local_target(Some("/\\evil.example")), None);
        assert_eq!(local_target(None), None);
    }
}
