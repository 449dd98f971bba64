//! Health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the data backend be reached? Failure → pulled from the load balancer. |
//!
//! Both paths are excluded from the middleware pipeline, so a probe never
//! triggers a locale redirect or a call to the auth backend.

use tracing::warn;

use crate::data::DataBackend;
use crate::{Request, Response, Status};

/// Liveness probe. Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> &'static str {
    "ok"
}

/// Readiness probe: `200 "ready"` when `data` answers a ping, `503` otherwise.
pub async fn readiness(data: &dyn DataBackend) -> Response {
    match data.ping().await {
        Ok(()) => Response::text("ready"),
        Err(e) => {
            warn!(error = %e, "readiness check failed");
            Response::builder().status(Status::ServiceUnavailable).text("data backend unavailable")
        }
    }
}
