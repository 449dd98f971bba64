//! Sign-in, sign-out and the signed-in user's own pages.

use std::sync::Arc;

use http::header::LOCATION;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{App, local_target, require_user};
use crate::auth::{self, AuthError};
use crate::data::NewEvent;
use crate::data::localize::localize_events;
use crate::{Request, Response, Status};

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

fn error_body(status: Status, message: &str) -> Response {
    let body = json!({ "error": message }).to_string();
    Response::builder().status(status).json(body.into_bytes())
}

pub(super) async fn login_page(_app: Arc<App>, req: Request) -> Response {
    Response::json_value(&json!({
        "page": "login",
        "locale": req.locale(),
        "next": local_target(req.query_param("next").as_deref()),
    }))
}

pub(super) async fn login(app: Arc<App>, req: Request) -> Response {
    let Ok(credentials) = serde_json::from_slice::<Credentials>(req.body()) else {
        return error_body(Status::BadRequest, "expected {\"email\", \"password\"}");
    };

    let grant = match app.auth.sign_in(&credentials.email, &credentials.password).await {
        Ok(grant) => grant,
        Err(AuthError::Rejected(_)) => return error_body(Status::Unauthorized, "invalid credentials"),
        Err(e) => {
            warn!(error = %e, "sign-in failed");
            return error_body(Status::BadGateway, "sign-in unavailable");
        }
    };

    let cookie = match auth::session_cookie(&app.config.session, &grant.tokens) {
        Ok(cookie) => cookie,
        Err(e) => {
            warn!(error = %e, "could not encode session");
            return Response::status(Status::InternalServerError);
        }
    };

    info!(user_id = %grant.user.id, "signed in");
    let fallback = format!("/{}/my-events", req.locale());
    let next = req.query_param("next");
    let target = local_target(next.as_deref()).unwrap_or(&fallback);
    let mut res = Response::redirect(Status::SeeOther, target);
    res.add_cookie(cookie);
    res
}

pub(super) async fn logout(app: Arc<App>, req: Request) -> Response {
    if let Some(token) = req.session().access_token() {
        if let Err(e) = app.auth.sign_out(token).await {
            warn!(error = %e, "sign-out at auth backend failed, clearing cookie anyway");
        }
    }
    let mut res = Response::redirect(Status::SeeOther, &format!("/{}/events", req.locale()));
    res.add_cookie(auth::clear_session_cookie(&app.config.session));
    res
}

pub(super) async fn profile(app: Arc<App>, req: Request) -> Result<Response, Response> {
    let (user, token) = require_user(&req)?;

    Ok(match app.data.profile(&user.id, token).await {
        Ok(profile) => Response::json_value(&json!({
            "locale": req.locale(),
            "user": user,
            "profile": profile,
        })),
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "could not load profile");
            Response::status(Status::BadGateway)
        }
    })
}

pub(super) async fn my_events(app: Arc<App>, req: Request) -> Result<Response, Response> {
    let (user, token) = require_user(&req)?;
    let locale = req.locale();

    let events = match app.data.events_by_owner(&user.id, token).await {
        Ok(events) => localize_events(app.data.as_ref(), events, locale).await,
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "could not load own events");
            Vec::new()
        }
    };
    Ok(Response::json_value(&json!({ "locale": locale, "events": events })))
}

pub(super) async fn create_form(_app: Arc<App>, req: Request) -> Result<Response, Response> {
    require_user(&req)?;
    Ok(Response::json_value(&json!({
        "page": "create-event",
        "locale": req.locale(),
        "fields": ["slug", "title", "description", "location", "starts_at", "ends_at"],
    })))
}

pub(super) async fn create_event(app: Arc<App>, req: Request) -> Result<Response, Response> {
    let (user, token) = require_user(&req)?;

    let new_event: NewEvent = serde_json::from_slice(req.body())
        .map_err(|e| error_body(Status::BadRequest, &e.to_string()))?;
    new_event
        .validate()
        .map_err(|problem| error_body(Status::UnprocessableContent, problem))?;

    Ok(match app.data.create_event(&user.id, &new_event, token).await {
        Ok(event) => {
            info!(user_id = %user.id, slug = %event.slug, "event created");
            let location = format!("/{}/events/{}", req.locale(), event.slug);
            match serde_json::to_vec(&event) {
                Ok(body) => Response::builder()
                    .status(Status::Created)
                    .header(LOCATION.as_str(), &location)
                    .json(body),
                Err(e) => {
                    warn!(error = %e, "failed to serialize created event");
                    Response::status(Status::InternalServerError)
                }
            }
        }
        Err(e) => {
            warn!(error = %e, user_id = %user.id, "could not create event");
            error_body(Status::BadGateway, "could not save event")
        }
    })
}
