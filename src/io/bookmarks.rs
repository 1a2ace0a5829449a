use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Event, EventId};

/// How many recently visited events are kept.
pub const MAX_BOOKMARKS: usize = 50;

/// A locally remembered event, so its link can be found again later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: EventId,
    pub name: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Event> for Bookmark {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            name: event.name.clone(),
            currency: event.currency.code().to_string(),
            created_at: event.created_at,
        }
    }
}

/// JSON file of recently visited events, most recent first.
pub struct Bookmarks {
    path: PathBuf,
}

impl Bookmarks {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all bookmarks. A missing file means no bookmarks yet.
    pub fn list(&self) -> Result<Vec<Bookmark>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read bookmarks from {}", self.path.display())
                });
            }
        };

        serde_json::from_str(&contents)
            .with_context(|| format!("Corrupt bookmarks file {}", self.path.display()))
    }

    /// Put `event` at the top of the list, replacing an older entry for it.
    pub fn remember(&self, event: &Event) -> Result<()> {
        let mut bookmarks = self.list()?;
        bookmarks.retain(|b| b.id != event.id);
        bookmarks.insert(0, Bookmark::from(event));
        bookmarks.truncate(MAX_BOOKMARKS);
        self.save(&bookmarks)
    }

    /// Remove an event from the list. Returns whether it was there.
    pub fn forget(&self, event_id: &EventId) -> Result<bool> {
        let mut bookmarks = self.list()?;
        let before = bookmarks.len();
        bookmarks.retain(|b| &b.id != event_id);
        if bookmarks.len() == before {
            return Ok(false);
        }
        self.save(&bookmarks)?;
        Ok(true)
    }

    fn save(&self, bookmarks: &[Bookmark]) -> Result<()> {
        let json = serde_json::to_string_pretty(bookmarks)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write bookmarks to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::domain::Currency;

    fn bookmarks() -> (Bookmarks, TempDir) {
        let dir = TempDir::new().unwrap();
        let bookmarks = Bookmarks::new(dir.path().join("bookmarks.json"));
        (bookmarks, dir)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (bookmarks, _dir) = bookmarks();
        assert!(bookmarks.list().unwrap().is_empty());
    }

    #[test]
    fn test_remember_puts_latest_first_without_duplicates() {
        let (bookmarks, _dir) = bookmarks();
        let trip = Event::new("Trip", Currency::default());
        let dinner = Event::new("Dinner", Currency::default());

        bookmarks.remember(&trip).unwrap();
        bookmarks.remember(&dinner).unwrap();
        bookmarks.remember(&trip).unwrap();

        let names: Vec<String> = bookmarks.list().unwrap().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Trip", "Dinner"]);
    }

    #[test]
    fn test_list_is_capped() {
        let (bookmarks, _dir) = bookmarks();
        for i in 0..(MAX_BOOKMARKS + 5) {
            bookmarks
                .remember(&Event::new(format!("Event {}", i), Currency::default()))
                .unwrap();
        }

        let list = bookmarks.list().unwrap();
        assert_eq!(list.len(), MAX_BOOKMARKS);
        assert_eq!(list[0].name, format!("Event {}", MAX_BOOKMARKS + 4));
    }

    #[test]
    fn test_forget() {
        let (bookmarks, _dir) = bookmarks();
        let trip = Event::new("Trip", Currency::default());
        bookmarks.remember(&trip).unwrap();

        assert!(bookmarks.forget(&trip.id).unwrap());
        assert!(!bookmarks.forget(&trip.id).unwrap());
        assert!(bookmarks.list().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let (bookmarks, _dir) = bookmarks();
        fs::write(bookmarks.path(), "not json").unwrap();
        assert!(bookmarks.list().is_err());
    }
}
