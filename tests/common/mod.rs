// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use divvy::application::SplitService;
use divvy::domain::{Event, ParticipantId};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(SplitService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = SplitService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Connection URL of the database behind [`test_service`]
pub fn test_database_url(temp_dir: &TempDir) -> String {
    format!("sqlite:{}", temp_dir.path().join("test.db").display())
}

/// Test fixture: an event with three participants
pub struct Trip {
    pub event: Event,
    pub alice: ParticipantId,
    pub bob: ParticipantId,
    pub cara: ParticipantId,
}

impl Trip {
    pub async fn create(service: &SplitService, currency: &str) -> Result<Self> {
        let event = service.create_event("Trip", Some(currency)).await?;
        let alice = service.add_participant(&event.id, "Alice").await?.id;
        let bob = service.add_participant(&event.id, "Bob").await?.id;
        let cara = service.add_participant(&event.id, "Cara").await?.id;
        Ok(Self {
            event,
            alice,
            bob,
            cara,
        })
    }
}
