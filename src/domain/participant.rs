use serde::{Deserialize, Serialize};

use super::EventId;

/// Store-assigned participant id. Ids increase with insertion, so ordering by id
/// is the participant insertion order.
pub type ParticipantId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub event_id: EventId,
    pub name: String,
}

/// Trim a participant name, rejecting names that end up empty.
pub fn normalize_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
