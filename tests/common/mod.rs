//! In-process auth and data backends plus wiring helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use marquee::auth::{AuthBackend, AuthError, Grant, SessionTokens, User};
use marquee::config::ConfigLayer;
use marquee::data::{DataBackend, DataError, Event, EventStatus, NewEvent, Profile, Talk, Translation};
use marquee::middleware::{LocaleResolver, Pipeline, SessionRefresher};
use marquee::pages::{self, App};
use marquee::{Config, Gateway, Locale, Method, Request};

pub const SESSION_COOKIE: &str = "sb-auth-token";

pub fn config() -> Config {
    ConfigLayer::default().finalize().expect("defaults are valid")
}

/// The production wiring over fake backends.
pub fn gateway(auth: Arc<FakeAuth>, data: Arc<MemoryData>) -> Gateway {
    let config = config();
    let pipeline = Pipeline::standard(
        LocaleResolver::new(config.locale.clone()),
        SessionRefresher::new(auth.clone(), config.session.clone()),
    );
    let router = pages::routes(Arc::new(App::new(auth, data, config)));
    Gateway::new(router).pipeline(pipeline)
}

pub fn get(uri: &str) -> Request {
    Request::new(Method::Get, uri.parse().expect("valid uri"))
}

pub fn post(uri: &str, body: &str) -> Request {
    Request::new(Method::Post, uri.parse().expect("valid uri"))
        .with_header("content-type", "application/json")
        .with_body(body.to_owned())
}

pub fn user(id: &str) -> User {
    User { id: id.to_owned(), email: Some(format!("{id}@example.com")) }
}

/// Tokens named after `suffix`, expiring `ttl` seconds from now.
pub fn tokens(suffix: &str, ttl: i64) -> SessionTokens {
    SessionTokens {
        access_token: format!("at-{suffix}"),
        refresh_token: format!("rt-{suffix}"),
        expires_at: Utc::now().timestamp() + ttl,
    }
}

pub fn session_cookie_header(tokens: &SessionTokens) -> String {
    format!("{SESSION_COOKIE}={}", tokens.to_cookie_value().expect("encodable"))
}

// ── Auth ─────────────────────────────────────────────────────────────────────

/// Auth backend keyed by token strings.
#[derive(Default)]
pub struct FakeAuth {
    access: Mutex<HashMap<String, User>>,
    refresh: Mutex<HashMap<String, Grant>>,
    passwords: Mutex<HashMap<(String, String), Grant>>,
    unavailable: AtomicBool,
    pub calls: Mutex<Vec<String>>,
    pub signed_out: Mutex<Vec<String>>,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Accepts `tokens.access_token` as belonging to `user`.
    pub fn accept(&self, tokens: &SessionTokens, user: User) {
        self.access.lock().unwrap().insert(tokens.access_token.clone(), user);
    }

    /// Lets `old.refresh_token` be exchanged for `new`.
    pub fn allow_refresh(&self, old: &SessionTokens, new: SessionTokens, user: User) {
        self.accept(&new, user.clone());
        self.refresh.lock().unwrap().insert(old.refresh_token.clone(), Grant { tokens: new, user });
    }

    pub fn register(&self, email: &str, password: &str, tokens: SessionTokens, user: User) {
        self.accept(&tokens, user.clone());
        self.passwords
            .lock()
            .unwrap()
            .insert((email.to_owned(), password.to_owned()), Grant { tokens, user });
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> Result<(), AuthError> {
        self.calls.lock().unwrap().push(call.to_owned());
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::Transport("connection refused".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn refresh(&self, refresh_token: &str) -> Result<Grant, AuthError> {
        self.record("refresh")?;
        self.refresh
            .lock()
            .unwrap()
            .remove(refresh_token)
            .ok_or_else(|| AuthError::Rejected("invalid refresh token".to_owned()))
    }

    async fn user(&self, access_token: &str) -> Result<User, AuthError> {
        self.record("user")?;
        self.access
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| AuthError::Rejected("invalid jwt".to_owned()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Grant, AuthError> {
        self.record("sign_in")?;
        self.passwords
            .lock()
            .unwrap()
            .get(&(email.to_owned(), password.to_owned()))
            .cloned()
            .ok_or_else(|| AuthError::Rejected("invalid login credentials".to_owned()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.record("sign_out")?;
        self.signed_out.lock().unwrap().push(access_token.to_owned());
        Ok(())
    }
}

// ── Data ─────────────────────────────────────────────────────────────────────

/// Tables held in memory.
#[derive(Default)]
pub struct MemoryData {
    pub events: Mutex<Vec<Event>>,
    pub talks: Vec<Talk>,
    pub event_translations: Vec<Translation>,
    pub talk_translations: Vec<Translation>,
    pub profiles: Vec<Profile>,
    unavailable: AtomicBool,
}

impl MemoryData {
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DataError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DataError::Transport("connection refused".to_owned()));
        }
        Ok(())
    }

    fn translations(rows: &[Translation], ids: &[i64], locale: Locale) -> Vec<Translation> {
        rows.iter()
            .filter(|t| t.locale == locale && ids.contains(&t.record_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DataBackend for MemoryData {
    async fn events_by_status(&self, status: EventStatus) -> Result<Vec<Event>, DataError> {
        self.check()?;
        let mut rows: Vec<Event> =
            self.events.lock().unwrap().iter().filter(|e| e.status == status).cloned().collect();
        rows.sort_by_key(|e| e.starts_at);
        Ok(rows)
    }

    async fn event_by_slug(&self, slug: &str) -> Result<Option<Event>, DataError> {
        self.check()?;
        Ok(self.events.lock().unwrap().iter().find(|e| e.slug == slug).cloned())
    }

    async fn events_by_owner(&self, owner_id: &str, _access_token: &str) -> Result<Vec<Event>, DataError> {
        self.check()?;
        let mut rows: Vec<Event> =
            self.events.lock().unwrap().iter().filter(|e| e.owner_id == owner_id).cloned().collect();
        rows.sort_by_key(|e| e.starts_at);
        Ok(rows)
    }

    async fn event_translations(&self, event_ids: &[i64], locale: Locale) -> Result<Vec<Translation>, DataError> {
        self.check()?;
        Ok(Self::translations(&self.event_translations, event_ids, locale))
    }

    async fn talks(&self, event_id: i64) -> Result<Vec<Talk>, DataError> {
        self.check()?;
        let mut rows: Vec<Talk> = self.talks.iter().filter(|t| t.event_id == event_id).cloned().collect();
        rows.sort_by_key(|t| t.starts_at);
        Ok(rows)
    }

    async fn talk_translations(&self, talk_ids: &[i64], locale: Locale) -> Result<Vec<Translation>, DataError> {
        self.check()?;
        Ok(Self::translations(&self.talk_translations, talk_ids, locale))
    }

    async fn profile(&self, user_id: &str, _access_token: &str) -> Result<Option<Profile>, DataError> {
        self.check()?;
        Ok(self.profiles.iter().find(|p| p.id == user_id).cloned())
    }

    async fn create_event(&self, owner_id: &str, event: &NewEvent, _access_token: &str) -> Result<Event, DataError> {
        self.check()?;
        let mut events = self.events.lock().unwrap();
        let row = Event {
            id: events.len() as i64 + 1,
            slug: event.slug.clone(),
            status: EventStatus::Draft,
            owner_id: owner_id.to_owned(),
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            location: event.location.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
        };
        events.push(row.clone());
        Ok(row)
    }

    async fn ping(&self) -> Result<(), DataError> {
        self.check()
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 11, day, hour, 0, 0).single().expect("valid date")
}

pub fn event(id: i64, slug: &str, status: EventStatus, owner: &str) -> Event {
    Event {
        id,
        slug: slug.to_owned(),
        status,
        owner_id: owner.to_owned(),
        starts_at: at(id as u32, 9),
        ends_at: at(id as u32, 9) + Duration::hours(8),
        location: Some("Madrid".to_owned()),
        title: format!("{slug} title"),
        description: Some(format!("{slug} description")),
    }
}

/// Two published events (one translated to Spanish), one draft and one
/// cancelled, all owned by `owner-1`; a two-talk agenda on the first.
pub fn catalogue() -> MemoryData {
    let events = vec![
        event(2, "rust-meetup", EventStatus::Published, "owner-1"),
        event(1, "rustconf", EventStatus::Published, "owner-1"),
        event(3, "secret-draft", EventStatus::Draft, "owner-1"),
        event(4, "cancelled-party", EventStatus::Cancelled, "owner-1"),
    ];
    let talks = vec![
        Talk {
            id: 11,
            event_id: 1,
            speaker: "Ana".to_owned(),
            starts_at: at(1, 11),
            ends_at: at(1, 12),
            title: "Ownership".to_owned(),
            description: None,
        },
        Talk {
            id: 10,
            event_id: 1,
            speaker: "Luis".to_owned(),
            starts_at: at(1, 10),
            ends_at: at(1, 11),
            title: "Keynote".to_owned(),
            description: Some("Opening".to_owned()),
        },
    ];
    MemoryData {
        events: Mutex::new(events),
        talks,
        event_translations: vec![Translation {
            record_id: 1,
            locale: Locale::Es,
            title: "RustConf en español".to_owned(),
            description: None,
        }],
        talk_translations: vec![Translation {
            record_id: 10,
            locale: Locale::Es,
            title: "Discurso inaugural".to_owned(),
            description: Some("Apertura".to_owned()),
        }],
        profiles: vec![Profile {
            id: "owner-1".to_owned(),
            display_name: "Owner One".to_owned(),
            bio: None,
            avatar_url: None,
        }],
        unavailable: AtomicBool::new(false),
    }
}

pub fn body_json(res: &marquee::Response) -> serde_json::Value {
    serde_json::from_slice(res.body()).expect("json body")
}
