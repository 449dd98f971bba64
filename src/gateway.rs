//! Per-request orchestration.
//!
//! ```text
//! Request ─► Matcher ─match──► Pipeline ─Redirect─────────────► Response
//!               │                  └─Next─► Router ─► handler ─► + cookies
//!               └─skip────────────────────► Router ─► handler ─► Response
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, info, info_span};

use crate::middleware::{Matcher, Pipeline};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::status::Status;

/// Everything the server needs to answer a request.
///
/// Cheap to clone: the router is behind an `Arc` and the pipeline holds its
/// stages behind `Arc`s.
#[derive(Clone)]
pub struct Gateway {
    router: Arc<Router>,
    pipeline: Pipeline,
    matcher: Matcher,
}

impl Gateway {
    /// A gateway with no middleware; every request goes straight to `router`.
    pub fn new(router: Router) -> Self {
        Self { router: Arc::new(router), pipeline: Pipeline::new(), matcher: Matcher::default() }
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn matcher(mut self, matcher: Matcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Runs `req` through the pipeline (when the matcher selects it) and the
    /// router, and merges the pipeline's cookies into the final response.
    pub async fn handle(&self, req: Request) -> Response {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        async move {
            let started = Instant::now();
            let res = self.dispatch(req).await;
            info!(
                status = u16::from(res.status_code()),
                latency_ms = started.elapsed().as_millis() as u64,
                "request completed"
            );
            res
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, mut req: Request) -> Response {
        let cookies = if self.matcher.matches(req.path()) {
            match self.pipeline.run(&mut req).await.into_parts() {
                (Some(redirect), _) => return redirect,
                (None, cookies) => cookies,
            }
        } else {
            Vec::new()
        };

        let mut res = match self.router.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.set_params(params);
                handler.call(req).await
            }
            None => Response::status(Status::NotFound),
        };
        res.prepend_cookies(cookies);
        res
    }
}
