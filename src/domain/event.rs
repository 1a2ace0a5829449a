use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Currency, Expense, Participant};

/// Opaque, unguessable event token. It doubles as the share-link path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generate a fresh token from a random v4 UUID (32 lowercase hex chars).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name given to events created with a blank name.
pub const DEFAULT_EVENT_NAME: &str = "New Event";

/// One shared-expense group. Participants and expenses hang off it and are
/// removed together with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(name: impl Into<String>, currency: Currency) -> Self {
        let name = name.into().trim().to_string();
        Self {
            id: EventId::generate(),
            name: if name.is_empty() {
                DEFAULT_EVENT_NAME.to_string()
            } else {
                name
            },
            currency,
            created_at: Utc::now(),
        }
    }
}

/// Immutable view of one event as the settlement engine sees it.
/// Participants and expenses are in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub event: Event,
    pub participants: Vec<Participant>,
    pub expenses: Vec<Expense>,
}

/// Build the share link for an event: `{base_url}/e/{id}`.
pub fn share_link(base_url: &str, event_id: &EventId) -> String {
    format!("{}/e/{}", base_url.trim_end_matches('/'), event_id)
}
