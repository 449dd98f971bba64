//! Which paths go through the pipeline.
//!
//! Static assets, image endpoints, well-known files and health probes skip
//! locale resolution and session refresh entirely: they are never localized
//! and must not trigger a call to the auth backend.

/// Path filter in front of the [`Pipeline`](super::Pipeline).
#[derive(Clone, Debug)]
pub struct Matcher {
    prefixes: Vec<String>,
    exact: Vec<String>,
    extensions: Vec<String>,
}

const PREFIXES: &[&str] = &["/static/", "/assets/", "/images/", "/_image", "/.well-known/", "/api/"];

const EXACT: &[&str] = &[
    "/favicon.ico",
    "/icon.png",
    "/apple-icon.png",
    "/manifest.json",
    "/manifest.webmanifest",
    "/robots.txt",
    "/sitemap.xml",
    "/sw.js",
    "/healthz",
    "/readyz",
];

const EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "css", "js", "map", "woff", "woff2", "txt", "xml",
];

impl Matcher {
    /// A matcher that runs the pipeline on every path.
    pub fn all() -> Self {
        Self { prefixes: Vec::new(), exact: Vec::new(), extensions: Vec::new() }
    }

    /// Excludes `path` prefixes in addition to the current set.
    pub fn exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn exclude_path(mut self, path: impl Into<String>) -> Self {
        self.exact.push(path.into());
        self
    }

    /// `true` when `path` should run through the pipeline.
    pub fn matches(&self, path: &str) -> bool {
        if self.exact.iter().any(|p| p == path) {
            return false;
        }
        if self.prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return false;
        }
        !self.has_static_extension(path)
    }

    fn has_static_extension(&self, path: &str) -> bool {
        let last = path.rsplit('/').next().unwrap_or(path);
        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
            }
            _ => false,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_owned()).collect();
        Self { prefixes: owned(PREFIXES), exact: owned(EXACT), extensions: owned(EXTENSIONS) }
    }
}
