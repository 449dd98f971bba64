//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. Locale-prefixed pages are
//! registered with a `{locale}` parameter like any other segment; the pipeline
//! has already guaranteed the prefix is a supported locale by the time the
//! router sees the path.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// The application router.
///
/// Build it once at startup and hand it to a [`Gateway`](crate::Gateway).
/// Each [`Router::on`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// ```rust,no_run
    /// # use marquee::{Method, Request, Response, Router};
    /// # async fn list_events(_: Request) -> Response { Response::text("") }
    /// # async fn show_event(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get, "/{locale}/events",        list_events)
    ///     .on(Method::Get, "/{locale}/events/{slug}", show_event);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics on a malformed or conflicting route. Routes are static, so this
    /// surfaces at startup, never per request.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
