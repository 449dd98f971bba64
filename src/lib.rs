//! # marquee
//!
//! The request layer of a bilingual event-listings site. Every page request
//! passes through two stages before it reaches a page handler:
//!
//! 1. **Locale**: the URL must start with a supported locale (`/en/…`,
//!    `/es/…`). Anything else is redirected there, picking the locale from
//!    the preference cookie, then `Accept-Language`, then the configured
//!    default.
//! 2. **Session**: the auth cookie is validated against the external auth
//!    backend and silently refreshed when it is about to expire. A session
//!    that cannot be recovered becomes anonymous; protected pages then send
//!    the visitor to the login page.
//!
//! Cookies either stage sets reach the client on the final response, whether
//! that is a redirect or a rendered page.
//!
//! Static assets, well-known files and health probes skip both stages.
//!
//! ## Wiring
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use marquee::auth::GoTrueClient;
//! use marquee::data::RestClient;
//! use marquee::middleware::{LocaleResolver, Pipeline, SessionRefresher};
//! use marquee::pages::{self, App};
//! use marquee::{Config, Gateway, Server};
//!
//! # async fn run() -> Result<(), marquee::Error> {
//! let config = Config::load()?;
//! let backend = &config.backend;
//! let auth = Arc::new(GoTrueClient::new(&backend.url, &backend.anon_key, backend.timeout)?);
//! let data = Arc::new(RestClient::new(&backend.url, &backend.anon_key, backend.timeout)?);
//!
//! let pipeline = Pipeline::standard(
//!     LocaleResolver::new(config.locale.clone()),
//!     SessionRefresher::new(auth.clone(), config.session.clone()),
//! );
//! let server = Server::bind(config.addr).max_body_bytes(config.max_body_bytes);
//! let router = pages::routes(Arc::new(App::new(auth, data, config)));
//!
//! server.serve(Gateway::new(router).pipeline(pipeline)).await
//! # }
//! ```

mod cookie;
mod error;
mod gateway;
mod handler;
mod locale;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod auth;
pub mod config;
pub mod data;
pub mod health;
pub mod middleware;
pub mod pages;

pub use config::Config;
pub use cookie::{Cookie, SameSite};
pub use error::Error;
pub use gateway::Gateway;
pub use handler::Handler;
pub use locale::Locale;
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use status::Status;

/// `User-Agent` sent to the auth and data backends.
pub(crate) const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
