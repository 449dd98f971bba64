//! Unified error type.

use crate::config::ConfigError;

/// The error type returned by marquee's fallible startup operations.
///
/// Application-level errors (404, 401, a backend that is down) are expressed
/// as HTTP [`Response`](crate::Response) values or as an anonymous session,
/// not as `Error`s. This type surfaces infrastructure failures: loading the
/// configuration, binding to a port or building a backend client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}
