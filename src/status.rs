//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, or as a bare handler return value.
//!
//! ```rust
//! use marquee::{Response, Status};
//!
//! // status-only, no body
//! Response::status(Status::NoContent);
//!
//! // redirect after a form post
//! Response::redirect(Status::SeeOther, "/en/my-events");
//! ```
//!
//! Only the codes the site actually emits are listed. The pipeline and the
//! pages never need 1xx or the WebDAV family.

/// The HTTP status codes produced by the gateway, the pipeline and the pages.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                            // 200
    Created,                       // 201
    NoContent,                     // 204

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    Found,                         // 302
    SeeOther,                      // 303
    TemporaryRedirect,             // 307
    PermanentRedirect,             // 308

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,                    // 400
    Unauthorized,                  // 401
    Forbidden,                     // 403
    NotFound,                      // 404
    MethodNotAllowed,              // 405
    PayloadTooLarge,               // 413
    UnprocessableContent,          // 422

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,           // 500
    BadGateway,                    // 502
    ServiceUnavailable,            // 503
}

impl Status {
    /// `true` for the 3xx codes that carry a `location` header.
    pub fn is_redirect(self) -> bool {
        matches!(
            self,
            Self::Found | Self::SeeOther | Self::TemporaryRedirect | Self::PermanentRedirect
        )
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                   => 200,
            Status::Created              => 201,
            Status::NoContent            => 204,
            Status::Found                => 302,
            Status::SeeOther             => 303,
            Status::TemporaryRedirect    => 307,
            Status::PermanentRedirect    => 308,
            Status::BadRequest           => 400,
            Status::Unauthorized         => 401,
            Status::Forbidden            => 403,
            Status::NotFound             => 404,
            Status::MethodNotAllowed     => 405,
            Status::PayloadTooLarge      => 413,
            Status::UnprocessableContent => 422,
            Status::InternalServerError  => 500,
            Status::BadGateway           => 502,
            Status::ServiceUnavailable   => 503,
        }
    }
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> http::StatusCode {
        // Every variant maps to a registered code, so this never falls back.
        http::StatusCode::from_u16(s.into()).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}
