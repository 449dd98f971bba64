//! Supported locales and `Accept-Language` negotiation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A language the site is translated into.
///
/// Every request resolves to exactly one of these; there is no "unknown"
/// locale downstream of the pipeline.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Es];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }

    /// Splits a leading locale segment off `path`.
    ///
    /// Returns the locale and the remaining path (`/` for a bare prefix).
    /// Matching is exact and case-sensitive: `/enterprise` and `/EN/about`
    /// are not prefixed.
    pub fn strip_prefix(path: &str) -> Option<(Locale, &str)> {
        let trimmed = path.strip_prefix('/')?;
        let (candidate, rest) = match trimmed.find('/') {
            Some(pos) => (&trimmed[..pos], &trimmed[pos..]),
            None => (trimmed, ""),
        };
        let locale = candidate.parse::<Locale>().ok()?;
        Some((locale, if rest.is_empty() { "/" } else { rest }))
    }
}

impl FromStr for Locale {
    type Err = ();

    /// Exact, lowercase match. Region subtags are handled by [`negotiate`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            _    => Err(()),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the best supported locale from an `Accept-Language` header value.
///
/// Candidates are tried by descending quality (ties keep header order); each
/// is matched exactly, then by its primary subtag (`es-MX` → `es`). Entries
/// with `q=0` are refusals and never match.
pub fn negotiate(header: &str) -> Option<Locale> {
    parse_accept_language(header)
        .into_iter()
        .filter(|(_, q)| *q > 0.0)
        .find_map(|(tag, _)| {
            tag.parse::<Locale>()
                .ok()
                .or_else(|| tag.split('-').next().and_then(|primary| primary.parse::<Locale>().ok()))
        })
}

/// Parses into `(lowercased tag, quality)` pairs, sorted by quality descending.
/// A quality that is not a finite number is ignored, as if absent.
fn parse_accept_language(header: &str) -> Vec<(String, f32)> {
    let mut langs: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }

            let mut segments = part.split(';');
            let tag = segments.next()?.trim().to_lowercase();
            let quality = segments
                .find_map(|s| {
                    let q = s.trim().strip_prefix("q=")?.trim().parse::<f32>().ok()?;
                    q.is_finite().then_some(q)
                })
                .unwrap_or(1.0)
                .clamp(0.0, 1.0);

            Some((tag, quality))
        })
        .collect();

    // sort_by is stable: equal qualities keep header order
    langs.sort_by(|a, b| b.1.total_cmp(&a.1));
    langs
}
