//! Locale resolution stage.
//!
//! Resolution order: path prefix → preference cookie → `Accept-Language` →
//! configured default. A prefixed path passes through; anything else is
//! redirected to the same path under the resolved locale.

use async_trait::async_trait;
use tracing::debug;

use super::{Outcome, Stage};
use crate::config::LocaleConfig;
use crate::cookie::{Cookie, SameSite};
use crate::locale::{self, Locale};
use crate::request::Request;
use crate::status::Status;

/// Where a request's locale came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Source {
    Path,
    Cookie,
    Header,
    Default,
}

/// Resolves the active locale and enforces locale-prefixed URLs.
#[derive(Clone, Debug)]
pub struct LocaleResolver {
    config: LocaleConfig,
}

impl LocaleResolver {
    pub fn new(config: LocaleConfig) -> Self {
        Self { config }
    }

    /// Picks a locale for `req`. Never fails.
    pub fn resolve(&self, req: &Request) -> (Locale, Source) {
        if let Some((locale, _)) = Locale::strip_prefix(req.path()) {
            return (locale, Source::Path);
        }
        if let Some(locale) = req.cookie(&self.config.cookie_name).and_then(|v| v.parse::<Locale>().ok()) {
            return (locale, Source::Cookie);
        }
        if let Some(locale) = req.accept_language().and_then(locale::negotiate) {
            return (locale, Source::Header);
        }
        (self.config.default, Source::Default)
    }

    fn preference_cookie(&self, locale: Locale) -> Cookie {
        Cookie::new(&self.config.cookie_name, locale.as_str())
            .path("/")
            .max_age(self.config.cookie_max_age_secs)
            .same_site(SameSite::Lax)
    }
}

/// `/events?x=1` under `es` → `/es/events?x=1`; `/` → `/es`.
fn prefixed_location(locale: Locale, req: &Request) -> String {
    let path = req.path();
    let mut location = if path == "/" || path.is_empty() {
        format!("/{locale}")
    } else {
        format!("/{locale}{path}")
    };
    if let Some(query) = req.query() {
        location.push('?');
        location.push_str(query);
    }
    location
}

#[async_trait]
impl Stage for LocaleResolver {
    fn name(&self) -> &'static str { "locale" }

    async fn apply(&self, req: &mut Request, mut outcome: Outcome) -> Outcome {
        let (locale, source) = self.resolve(req);

        if req.cookie(&self.config.cookie_name) != Some(locale.as_str()) {
            outcome.set_cookie(self.preference_cookie(locale));
        }

        if source == Source::Path {
            req.extensions_mut().insert(locale);
            return outcome;
        }

        let location = prefixed_location(locale, req);
        debug!(%locale, ?source, %location, "redirecting to locale prefix");
        outcome.redirect(Status::TemporaryRedirect, location)
    }
}
