use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use super::App;
use crate::data::EventStatus;
use crate::data::localize::{localize_events, localize_talks};
use crate::{Request, Response, Status};

/// Published events, soonest first.
pub(super) async fn list(app: Arc<App>, req: Request) -> Response {
    let locale = req.locale();
    let events = match app.data.events_by_status(EventStatus::Published).await {
        Ok(events) => localize_events(app.data.as_ref(), events, locale).await,
        Err(e) => {
            warn!(error = %e, "could not load published events");
            Vec::new()
        }
    };
    Response::json_value(&json!({ "locale": locale, "events": events }))
}

/// One published event and its agenda.
pub(super) async fn show(app: Arc<App>, req: Request) -> Response {
    let locale = req.locale();
    let Some(slug) = req.param("slug") else {
        return Response::status(Status::NotFound);
    };

    let event = match app.data.event_by_slug(slug).await {
        Ok(Some(event)) if event.status == EventStatus::Published => event,
        Ok(_) => return Response::status(Status::NotFound),
        Err(e) => {
            warn!(error = %e, %slug, "could not load event");
            return Response::status(Status::BadGateway);
        }
    };

    let talks = match app.data.talks(event.id).await {
        Ok(talks) => localize_talks(app.data.as_ref(), talks, locale).await,
        Err(e) => {
            warn!(error = %e, %slug, "could not load agenda");
            Vec::new()
        }
    };
    let event = localize_events(app.data.as_ref(), vec![event], locale).await.pop();

    Response::json_value(&json!({ "locale": locale, "event": event, "talks": talks }))
}
