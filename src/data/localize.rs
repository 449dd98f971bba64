//! Overlaying translations onto base-language rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::{DataBackend, Event, EventStatus, Talk, Translation};
use crate::locale::Locale;

/// An event as shown to a visitor in one locale.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocalizedEvent {
    pub slug: String,
    pub status: EventStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
    pub title: String,
    pub description: Option<String>,
    /// `true` when title/description came from a translation row.
    pub translated: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocalizedTalk {
    pub speaker: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub translated: bool,
}

/// A base-language row whose title and description can be translated.
pub trait Localizable {
    type Localized;

    /// The id translation rows refer to.
    fn id(&self) -> i64;
    fn title(&self) -> &str;
    fn description(&self) -> Option<&str>;

    /// Builds the visitor-facing form around already-resolved `text`.
    fn with_text(self, text: Text) -> Self::Localized;
}

/// Title and description in the requested locale, or the base text.
pub struct Text {
    pub title: String,
    pub description: Option<String>,
    /// `true` when `title` came from a translation row.
    pub translated: bool,
}

impl Text {
    /// A translation with no description keeps the base description.
    fn resolve<T: Localizable>(row: &T, translation: Option<Translation>) -> Self {
        match translation {
            Some(t) => Self {
                title: t.title,
                description: t.description.or_else(|| row.description().map(str::to_owned)),
                translated: true,
            },
            None => Self {
                title: row.title().to_owned(),
                description: row.description().map(str::to_owned),
                translated: false,
            },
        }
    }
}

impl Localizable for Event {
    type Localized = LocalizedEvent;

    fn id(&self) -> i64 { self.id }
    fn title(&self) -> &str { &self.title }
    fn description(&self) -> Option<&str> { self.description.as_deref() }

    fn with_text(self, text: Text) -> LocalizedEvent {
        LocalizedEvent {
            slug: self.slug,
            status: self.status,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            location: self.location,
            title: text.title,
            description: text.description,
            translated: text.translated,
        }
    }
}

impl Localizable for Talk {
    type Localized = LocalizedTalk;

    fn id(&self) -> i64 { self.id }
    fn title(&self) -> &str { &self.title }
    fn description(&self) -> Option<&str> { self.description.as_deref() }

    fn with_text(self, text: Text) -> LocalizedTalk {
        LocalizedTalk {
            speaker: self.speaker,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            title: text.title,
            description: text.description,
            translated: text.translated,
        }
    }
}

/// Joins rows with their translations in `locale`, preserving row order.
///
/// A row with no translation keeps its base title and description. When
/// several translations share a record id the last one wins.
pub fn join<T: Localizable>(rows: Vec<T>, translations: Vec<Translation>, locale: Locale) -> Vec<T::Localized> {
    let mut index: HashMap<i64, Translation> = translations
        .into_iter()
        .filter(|t| t.locale == locale)
        .map(|t| (t.record_id, t))
        .collect();
    rows.into_iter()
        .map(|row| {
            let text = Text::resolve(&row, index.remove(&row.id()));
            row.with_text(text)
        })
        .collect()
}

/// Fetches translations for `events` and joins them.
///
/// A failed translation fetch degrades to base-language text.
pub async fn localize_events(
    data: &dyn DataBackend,
    events: Vec<Event>,
    locale: Locale,
) -> Vec<LocalizedEvent> {
    if events.is_empty() {
        return Vec::new();
    }
    let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    let translations = data.event_translations(&ids, locale).await.unwrap_or_else(|e| {
        warn!(error = %e, %locale, "event translations unavailable, using base text");
        Vec::new()
    });
    join(events, translations, locale)
}

pub async fn localize_talks(data: &dyn DataBackend, talks: Vec<Talk>, locale: Locale) -> Vec<LocalizedTalk> {
    if talks.is_empty() {
        return Vec::new();
    }
    let ids: Vec<i64> = talks.iter().map(|t| t.id).collect();
    let translations = data.talk_translations(&ids, locale).await.unwrap_or_else(|e| {
        warn!(error = %e, %locale, "talk translations unavailable, using base text");
        Vec::new()
    });
    join(talks, translations, locale)
}
