//! Layered configuration: built-in defaults, an optional TOML file, then
//! `MARQUEE_*` environment variables. Later layers override earlier ones.
//!
//! ```toml
//! [server]
//! addr = "0.0.0.0:3000"
//! max_body_bytes = 1048576
//!
//! [locale]
//! default = "es"
//!
//! [backend]
//! url = "https://project.example.co"
//! anon_key = "public-anon-key"
//!
//! [session]
//! secure_cookies = true
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::locale::Locale;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "MARQUEE_CONFIG";

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
const DEFAULT_BACKEND_URL: &str = "http://localhost:54321";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOCALE_COOKIE: &str = "locale";
const DEFAULT_SESSION_COOKIE: &str = "sb-auth-token";
const DEFAULT_REFRESH_MARGIN_SECS: i64 = 30;
const MAX_REFRESH_MARGIN_SECS: i64 = 60 * 60 * 24;
const LOCALE_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 365;
const SESSION_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 400;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: std::io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: String, source: toml::de::Error },

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

// ── Runtime configuration ─────────────────────────────────────────────────────

/// Fully resolved configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    /// Request bodies larger than this are answered with `413`.
    pub max_body_bytes: usize,
    pub locale: LocaleConfig,
    pub backend: BackendConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug)]
pub struct LocaleConfig {
    pub default: Locale,
    pub cookie_name: String,
    pub cookie_max_age_secs: i64,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_max_age_secs: i64,
    pub refresh_margin_secs: i64,
    pub secure_cookies: bool,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: Locale::default(),
            cookie_name: DEFAULT_LOCALE_COOKIE.to_owned(),
            cookie_max_age_secs: LOCALE_COOKIE_MAX_AGE_SECS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE.to_owned(),
            cookie_max_age_secs: SESSION_COOKIE_MAX_AGE_SECS,
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
            secure_cookies: false,
        }
    }
}

impl Config {
    /// Defaults, then the file named by `MARQUEE_CONFIG` (if set), then the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut layer = ConfigLayer::default();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            layer.merge(ConfigLayer::from_file(Path::new(&path))?);
        }
        layer.merge(ConfigLayer::from_env(|key| std::env::var(key).ok())?);
        layer.finalize()
    }
}

// ── Layers ────────────────────────────────────────────────────────────────────

/// Partial configuration, as read from one source.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub server: ServerLayer,
    #[serde(default)]
    pub locale: LocaleLayer,
    #[serde(default)]
    pub backend: BackendLayer,
    #[serde(default)]
    pub session: SessionLayer,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerLayer {
    pub addr: Option<String>,
    pub max_body_bytes: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocaleLayer {
    pub default: Option<String>,
    pub cookie_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendLayer {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionLayer {
    pub cookie_name: Option<String>,
    pub refresh_margin_secs: Option<i64>,
    pub secure_cookies: Option<bool>,
}

fn parsed<T: std::str::FromStr>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| v.parse().map_err(|_| ConfigError::Invalid { key, value: v }))
        .transpose()
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    value
        .map(|v| match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: v }),
        })
        .transpose()
}

impl ConfigLayer {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: shown.clone(), source })?;
        debug!(path = %shown, "loaded config file");
        Self::from_toml(&text).map_err(|source| ConfigError::Parse { path: shown, source })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads `MARQUEE_*` variables through `var`, so tests need not touch
    /// the process environment.
    pub fn from_env(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerLayer {
                addr: var("MARQUEE_ADDR"),
                max_body_bytes: parsed("MARQUEE_MAX_BODY_BYTES", var("MARQUEE_MAX_BODY_BYTES"))?,
            },
            locale: LocaleLayer {
                default: var("MARQUEE_DEFAULT_LOCALE"),
                cookie_name: var("MARQUEE_LOCALE_COOKIE"),
            },
            backend: BackendLayer {
                url: var("MARQUEE_BACKEND_URL"),
                anon_key: var("MARQUEE_BACKEND_ANON_KEY"),
                timeout_secs: parsed("MARQUEE_BACKEND_TIMEOUT_SECS", var("MARQUEE_BACKEND_TIMEOUT_SECS"))?,
            },
            session: SessionLayer {
                cookie_name: var("MARQUEE_SESSION_COOKIE"),
                refresh_margin_secs: parsed(
                    "MARQUEE_SESSION_REFRESH_MARGIN_SECS",
                    var("MARQUEE_SESSION_REFRESH_MARGIN_SECS"),
                )?,
                secure_cookies: parse_bool("MARQUEE_SECURE_COOKIES", var("MARQUEE_SECURE_COOKIES"))?,
            },
        })
    }

    pub fn merge(&mut self, other: ConfigLayer) {
        fn take<T>(slot: &mut Option<T>, other: Option<T>) {
            if other.is_some() {
                *slot = other;
            }
        }
        take(&mut self.server.addr, other.server.addr);
        take(&mut self.server.max_body_bytes, other.server.max_body_bytes);
        take(&mut self.locale.default, other.locale.default);
        take(&mut self.locale.cookie_name, other.locale.cookie_name);
        take(&mut self.backend.url, other.backend.url);
        take(&mut self.backend.anon_key, other.backend.anon_key);
        take(&mut self.backend.timeout_secs, other.backend.timeout_secs);
        take(&mut self.session.cookie_name, other.session.cookie_name);
        take(&mut self.session.refresh_margin_secs, other.session.refresh_margin_secs);
        take(&mut self.session.secure_cookies, other.session.secure_cookies);
    }

    pub fn finalize(self) -> Result<Config, ConfigError> {
        let addr = self.server.addr.unwrap_or_else(|| DEFAULT_ADDR.to_owned());
        let addr = addr
            .parse()
            .map_err(|_| ConfigError::Invalid { key: "server.addr", value: addr.clone() })?;

        let max_body_bytes = self.server.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        if max_body_bytes == 0 {
            return Err(ConfigError::Invalid { key: "server.max_body_bytes", value: "0".to_owned() });
        }

        let default_locale = match self.locale.default {
            Some(code) => code
                .parse::<Locale>()
                .map_err(|()| ConfigError::Invalid { key: "locale.default", value: code.clone() })?,
            None => Locale::default(),
        };

        let refresh_margin_secs = self.session.refresh_margin_secs.unwrap_or(DEFAULT_REFRESH_MARGIN_SECS);
        if !(0..=MAX_REFRESH_MARGIN_SECS).contains(&refresh_margin_secs) {
            return Err(ConfigError::Invalid {
                key: "session.refresh_margin_secs",
                value: refresh_margin_secs.to_string(),
            });
        }

        Ok(Config {
            addr,
            max_body_bytes,
            locale: LocaleConfig {
                default: default_locale,
                cookie_name: self.locale.cookie_name.unwrap_or_else(|| DEFAULT_LOCALE_COOKIE.to_owned()),
                cookie_max_age_secs: LOCALE_COOKIE_MAX_AGE_SECS,
            },
            backend: BackendConfig {
                url: self.backend.url.unwrap_or_else(|| DEFAULT_BACKEND_URL.to_owned()),
                anon_key: self.backend.anon_key.unwrap_or_default(),
                timeout: Duration::from_secs(self.backend.timeout_secs.unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS)),
            },
            session: SessionConfig {
                cookie_name: self.session.cookie_name.unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_owned()),
                cookie_max_age_secs: SESSION_COOKIE_MAX_AGE_SECS,
                refresh_margin_secs,
                secure_cookies: self.session.secure_cookies.unwrap_or(false),
            },
        })
    }
}
