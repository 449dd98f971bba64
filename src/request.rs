//! Incoming HTTP request type.

use std::borrow::Cow;
use std::collections::HashMap;

use bytes::Bytes;
use http::header::{ACCEPT_LANGUAGE, COOKIE};
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Uri};

use crate::auth::{Session, User};
use crate::cookie;
use crate::locale::Locale;
use crate::method::Method;

/// An incoming HTTP request, with its body already collected.
///
/// Pipeline stages annotate the request through its typed
/// [`extensions`](Request::extensions): the locale stage inserts the resolved
/// [`Locale`], the session stage inserts the [`Session`]. Handlers read them
/// back with [`locale`](Request::locale) and [`session`](Request::session).
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) extensions: Extensions,
}

static ANONYMOUS: Session = Session::Anonymous;

impl Request {
    /// Builds a request with no headers and an empty body.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    pub(crate) fn from_parts(method: Method, parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            extensions: parts.extensions,
        }
    }

    /// Appends a header. Names or values that are not valid HTTP are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/{locale}/events/{slug}`, `req.param("slug")` on
    /// `/es/events/rustconf` returns `Some("rustconf")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the value of the request cookie `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| cookie::find(header, name))
    }

    pub fn accept_language(&self) -> Option<&str> {
        self.headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok())
    }

    /// A single `name=value` query parameter, percent-decoded. `None` if
    /// absent or not valid UTF-8 once decoded.
    pub fn query_param(&self, name: &str) -> Option<Cow<'_, str>> {
        let raw = self.query()?.split('&').find_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            (k == name).then_some(v)
        })?;
        urlencoding::decode(raw).ok()
    }

    /// The locale resolved by the pipeline.
    ///
    /// Falls back to the `{locale}` route parameter, then to the default
    /// locale, for requests that bypassed the pipeline.
    pub fn locale(&self) -> Locale {
        self.extensions
            .get::<Locale>()
            .copied()
            .or_else(|| self.param("locale").and_then(|l| l.parse().ok()))
            .unwrap_or_default()
    }

    /// The session attached by the pipeline; anonymous if none was attached.
    pub fn session(&self) -> &Session {
        self.extensions.get::<Session>().unwrap_or(&ANONYMOUS)
    }

    pub fn user(&self) -> Option<&User> {
        self.session().user()
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> Request {
        Request::new(Method::Get, uri.parse().unwrap())
    }

    #[test]
    fn reads_cookie_across_headers() {
        let req = get("/").with_header("cookie", "a=1").with_header("cookie", "locale=es");
        assert_eq!(req.cookie("locale"), Some("es"));
        assert_eq!(req.cookie("a"), Some("1"));
        assert_eq!(req.cookie("b"), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = get("/").with_header("Accept-Language", "es");
        assert_eq!(req.header("accept-language"), Some("es"));
        assert_eq!(req.accept_language(), Some("es"));
    }

    #[test]
    fn locale_prefers_extension_over_param() {
        let mut req = get("/es/events");
        req.set_params(HashMap::from([("locale".to_owned(), "es".to_owned())]));
        assert_eq!(req.locale(), Locale::Es);
        req.extensions_mut().insert(Locale::En);
        assert_eq!(req.locale(), Locale::En);
    }

    #[test]
    fn missing_session_is_anonymous() {
        let req = get("/en/profile");
        assert!(!req.session().is_authenticated());
        assert!(req.user().is_none());
    }

    #[test]
    fn query_param_lookup() {
        let req = get("/en/login?next=/en/profile&x=1");
        assert_eq!(req.query_param("next").as_deref(), Some("/en/profile"));
        assert_eq!(req.query_param("y"), None);
    }

    #[test]
    fn query_param_is_percent_decoded() {
        let req = get("/en/login?next=%2Fen%2Fevents%3Fq%3Da%2526b&x=1");
        assert_eq!(req.query_param("next").as_deref(), Some("/en/events?q=a%26b"));
        assert_eq!(get("/en/login?next=%FF").query_param("next"), None);
    }
}
