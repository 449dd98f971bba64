//! Request `Cookie` parsing and response `Set-Cookie` serialization.
//!
//! Both cookies this crate manages (the locale preference and the auth
//! session) carry values that are already cookie-safe: a locale code, or a
//! base64url blob. Values are therefore written verbatim, never quoted.

use std::fmt;

/// `SameSite` attribute values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax    => "Lax",
            Self::None   => "None",
        }
    }
}

/// A cookie to be sent to the client via `Set-Cookie`.
///
/// ```rust
/// use marquee::{Cookie, SameSite};
///
/// let c = Cookie::new("locale", "es")
///     .path("/")
///     .max_age(60)
///     .same_site(SameSite::Lax);
/// assert_eq!(c.to_string(), "locale=es; Path=/; Max-Age=60; SameSite=Lax");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cookie {
    name: String,
    value: String,
    path: Option<String>,
    max_age: Option<i64>,
    http_only: bool,
    secure: bool,
    same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            max_age: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    /// A cookie that tells the client to drop `name` immediately.
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "").path("/").max_age(0)
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn value(&self) -> &str { &self.value }

    /// `true` when this cookie deletes rather than sets.
    pub fn is_removal(&self) -> bool {
        self.max_age == Some(0)
    }
}

/// Renders the `Set-Cookie` header value.
impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        Ok(())
    }
}

/// Finds `name` in a `Cookie` request header value (`a=1; b=2`).
///
/// The first occurrence wins, matching how browsers order cookies with the
/// most specific path first.
pub(crate) fn find<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_many() {
        let header = "theme=dark; locale=es; sb-auth-token=base64-abc";
        assert_eq!(find(header, "locale"), Some("es"));
        assert_eq!(find(header, "sb-auth-token"), Some("base64-abc"));
    }

    #[test]
    fn missing_cookie_is_none() {
        assert_eq!(find("theme=dark", "locale"), None);
        assert_eq!(find("", "locale"), None);
    }

    #[test]
    fn name_must_match_exactly() {
        assert_eq!(find("xlocale=fr; locale=es", "locale"), Some("es"));
    }

    #[test]
    fn value_may_contain_equals() {
        assert_eq!(find("token=a=b=", "token"), Some("a=b="));
    }

    #[test]
    fn renders_all_attributes() {
        let c = Cookie::new("sb-auth-token", "base64-xyz")
            .path("/")
            .max_age(3600)
            .http_only(true)
            .secure(true)
            .same_site(SameSite::Lax);
        assert_eq!(
            c.to_string(),
            "sb-auth-token=base64-xyz; Path=/; Max-Age=3600; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn removal_expires_immediately() {
        let c = Cookie::removal("sb-auth-token");
        assert!(c.is_removal());
        assert_eq!(c.to_string(), "sb-auth-token=; Path=/; Max-Age=0");
    }
}
