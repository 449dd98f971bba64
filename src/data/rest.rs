//! HTTP client for a PostgREST-compatible data API (`/rest/v1/*`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{DataBackend, DataError, Event, EventStatus, NewEvent, Profile, Talk, Translation};
use crate::USER_AGENT;
use crate::locale::Locale;

/// Talks to the hosted data service.
#[derive(Clone, Debug)]
pub struct RestClient {
    http: Client,
    base_url: String,
    api_key: String,
}

/// `in.(1,2,3)` filter value.
fn in_list(ids: &[i64]) -> String {
    let joined: Vec<String> = ids.iter().map(i64::to_string).collect();
    format!("in.({})", joined.join(","))
}

impl RestClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().user_agent(USER_AGENT).timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url, api_key))
    }

    pub fn with_client(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url, api_key: api_key.into() }
    }

    /// A table request authorized as `access_token`, or anonymously.
    fn table(&self, method: Method, table: &str, access_token: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/{table}", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token.unwrap_or(&self.api_key))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
        access_token: Option<&str>,
    ) -> Result<Vec<T>, DataError> {
        let res = self.table(Method::GET, table, access_token).query(query).send().await?;
        Ok(check(res).await?.json().await?)
    }

    async fn translations(&self, table: &str, key: &str, ids: &[i64], locale: Locale) -> Result<Vec<Translation>, DataError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let select = format!("record_id:{key},locale,title,description");
        let ids = in_list(ids);
        let locale = format!("eq.{locale}");
        self.select(table, &[("select", &select), (key, &ids), ("locale", &locale)], None).await
    }
}

async fn check(res: reqwest::Response) -> Result<reqwest::Response, DataError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let detail = res.text().await.unwrap_or_default();
    Err(DataError::Status { status: status.as_u16(), detail })
}

#[async_trait]
impl DataBackend for RestClient {
    async fn events_by_status(&self, status: EventStatus) -> Result<Vec<Event>, DataError> {
        let status = format!("eq.{}", status.as_str());
        self.select("events", &[("select", "*"), ("status", &status), ("order", "starts_at.asc")], None)
            .await
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, DataError> {
        let slug = format!("eq.{slug}");
        let rows: Vec<Event> = self
            .select("events", &[("select", "*"), ("slug", &slug), ("limit", "1")], None)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn events_by_owner(&self, owner_id: &str, access_token: &str) -> Result<Vec<Event>, DataError> {
        let owner = format!("eq.{owner_id}");
        self.select(
            "events",
            &[("select", "*"), ("owner_id", &owner), ("order", "starts_at.asc")],
            Some(access_token),
        )
        .await
    }

    async fn event_translations(&self, event_ids: &[i64], locale: Locale) -> Result<Vec<Translation>, DataError> {
        self.translations("event_translations", "event_id", event_ids, locale).await
    }

    async fn talks(&self, event_id: i64) -> Result<Vec<Talk>, DataError> {
        let event = format!("eq.{event_id}");
        self.select("talks", &[("select", "*"), ("event_id", &event), ("order", "starts_at.asc")], None)
            .await
    }

    async fn talk_translations(&self, talk_ids: &[i64], locale: Locale) -> Result<Vec<Translation>, DataError> {
        self.translations("talk_translations", "talk_id", talk_ids, locale).await
    }

    async fn profile(&self, user_id: &str, access_token: &str) -> Result<Option<Profile>, DataError> {
        let id = format!("eq.{user_id}");
        let rows: Vec<Profile> = self
            .select("profiles", &[("select", "*"), ("id", &id), ("limit", "1")], Some(access_token))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn create_event(&self, owner_id: &str, event: &NewEvent, access_token: &str) -> Result<Event, DataError> {
        let body = json!({
            "slug": event.slug,
            "title": event.title,
            "description": event.description,
            "location": event.location,
            "starts_at": event.starts_at,
            "ends_at": event.ends_at,
            "owner_id": owner_id,
            "status": EventStatus::Draft,
        });
        let res = self
            .table(Method::POST, "events", Some(access_token))
            .header("prefer", "return=representation")
            .json(&body)
            .send()
            .await?;
        let rows: Vec<Event> = check(res).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DataError::Decode("insert returned no rows".to_owned()))
    }

    async fn ping(&self) -> Result<(), DataError> {
        let res = self.table(Method::GET, "", None).send().await?;
        check(res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_in_filter() {
        assert_eq!(in_list(&[1, 22, 3]), "in.(1,22,3)");
    }
}
