//! Request middleware.
//!
//! Every page request runs through a [`Pipeline`] of [`Stage`]s before it
//! reaches the router. A stage receives the request and the [`Outcome`] built
//! so far, and returns the outcome, possibly with more cookies or turned into
//! a redirect. Passing the outcome by value means no stage can drop what an
//! earlier stage did without doing so explicitly.
//!
//! ```text
//!             ┌──────────────┐        ┌────────────────┐
//! Request ───►│ LocaleResolver├─Outcome►│ SessionRefresher├─Outcome──► Gateway
//!             └──────────────┘        └────────────────┘
//!               Next | Redirect          + session cookie
//!               + locale cookie
//! ```
//!
//! Order matters: locale runs first so that a locale redirect still carries
//! whatever cookie the session stage renewed.

pub mod locale;
pub mod matcher;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use http::header::LOCATION;
use tracing::trace;

use crate::cookie::Cookie;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

pub use locale::LocaleResolver;
pub use matcher::Matcher;
pub use session::SessionRefresher;

/// What the pipeline has decided so far.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Continue to the router.
    Next,
    /// Answer with a redirect; the router is never consulted.
    Redirect { location: String, status: Status },
}

/// The response a pipeline accumulates: an [`Action`] plus cookies to set.
#[derive(Clone, Debug)]
pub struct Outcome {
    action: Action,
    cookies: Vec<Cookie>,
}

impl Outcome {
    /// A pass-through outcome with no cookies.
    pub fn next() -> Self {
        Self { action: Action::Next, cookies: Vec::new() }
    }

    /// Turns this outcome into a redirect, keeping its cookies.
    pub fn redirect(mut self, status: Status, location: impl Into<String>) -> Self {
        debug_assert!(status.is_redirect(), "not a redirect status");
        self.action = Action::Redirect { location: location.into(), status };
        self
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    pub fn action(&self) -> &Action { &self.action }
    pub fn cookies(&self) -> &[Cookie] { &self.cookies }

    pub fn is_redirect(&self) -> bool {
        matches!(self.action, Action::Redirect { .. })
    }

    /// The last cookie named `name`.
    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().rev().find(|c| c.name() == name)
    }

    /// Splits into a finished response (for a redirect) or the cookies to
    /// merge into the handler's response (for pass-through).
    pub fn into_parts(self) -> (Option<Response>, Vec<Cookie>) {
        match self.action {
            Action::Next => (None, self.cookies),
            Action::Redirect { location, status } => {
                let mut res = Response::builder()
                    .status(status)
                    .header(LOCATION.as_str(), &location)
                    .no_body();
                res.prepend_cookies(self.cookies);
                (Some(res), Vec::new())
            }
        }
    }
}

impl Default for Outcome {
    fn default() -> Self { Self::next() }
}

/// One request-to-outcome transformation.
///
/// Stages never fail: anything that goes wrong is folded into the outcome
/// (or into the request's extensions) and the next stage still runs.
#[async_trait]
pub trait Stage: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn apply(&self, req: &mut Request, outcome: Outcome) -> Outcome;
}

/// Stages applied in registration order.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// The site's pipeline: locale resolution, then session refresh.
    pub fn standard(locale: LocaleResolver, session: SessionRefresher) -> Self {
        Self::new().stage(locale).stage(session)
    }

    pub fn stage(mut self, stage: impl Stage) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Threads one outcome through every stage.
    pub async fn run(&self, req: &mut Request) -> Outcome {
        let mut outcome = Outcome::next();
        for stage in &self.stages {
            outcome = stage.apply(req, outcome).await;
            trace!(stage = stage.name(), redirect = outcome.is_redirect(), "stage applied");
        }
        outcome
    }
}
