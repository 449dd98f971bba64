//! Event, talk and profile records from the hosted data backend.
//!
//! Rows are fetched in their base language; translations live in separate
//! tables keyed by `(record_id, locale)` and are overlaid by [`localize`].

pub mod localize;
mod rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locale::Locale;

pub use rest::RestClient;

/// Publication state of an event. Only `Published` events are public.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Draft,
    Published,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft     => "draft",
            Self::Published => "published",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub slug: String,
    pub status: EventStatus,
    pub owner_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Talk {
    pub id: i64,
    pub event_id: i64,
    pub speaker: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A translated title/description for one event or talk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub record_id: i64,
    pub locale: Locale,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Input for creating an event. New events always start as drafts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl NewEvent {
    /// Returns the first problem with the input, if any.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty");
        }
        if self.slug.is_empty()
            || !self.slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err("slug must be lowercase letters, digits and dashes");
        }
        if self.ends_at < self.starts_at {
            return Err("event must not end before it starts");
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("data backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("data backend unavailable: {0}")]
    Transport(String),

    #[error("unexpected data backend payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// The hosted data service.
///
/// Calls that touch a user's own rows take that user's access token so the
/// backend's row-level policies apply; public reads use the anonymous key.
#[async_trait]
pub trait DataBackend: Send + Sync + 'static {
    /// Events with `status`, ordered by start time.
    async fn events_by_status(&self, status: EventStatus) -> Result<Vec<Event>, DataError>;

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, DataError>;

    /// All events owned by `owner_id`, any status, ordered by start time.
    async fn events_by_owner(&self, owner_id: &str, access_token: &str) -> Result<Vec<Event>, DataError>;

    async fn event_translations(&self, event_ids: &[i64], locale: Locale) -> Result<Vec<Translation>, DataError>;

    /// The agenda of one event, ordered by start time.
    async fn talks(&self, event_id: i64) -> Result<Vec<Talk>, DataError>;

    async fn talk_translations(&self, talk_ids: &[i64], locale: Locale) -> Result<Vec<Translation>, DataError>;

    async fn profile(&self, user_id: &str, access_token: &str) -> Result<Option<Profile>, DataError>;

    /// Inserts a draft event owned by `owner_id`.
    async fn create_event(&self, owner_id: &str, event: &NewEvent, access_token: &str) -> Result<Event, DataError>;

    /// Cheap reachability check for readiness probes.
    async fn ping(&self) -> Result<(), DataError>;
}
