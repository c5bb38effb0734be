//! Bundled content catalogs in JSON form.
//!
//! ```json
//! { "feed": [ { "id": "1", "media_url": "/videos/1.mp4", "lesson_id": "lesson_1" } ],
//!   "lessons": [ { "id": "lesson_1", "title": "..", "items": [ .. ] } ] }
//! ```

use std::collections::HashSet;

use lesson_core::model::{FeedItem, Lesson, LessonId};
use serde::Deserialize;

use crate::repository::{InMemoryRepository, StorageError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub feed: Vec<FeedItem>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Catalog {
    /// Parse and validate a catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed JSON, invalid lesson content,
    /// or a lesson id defined twice.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let catalog: Catalog =
            serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut seen = HashSet::new();
        for lesson in &catalog.lessons {
            if !seen.insert(lesson.id()) {
                return Err(StorageError::Serialization(format!(
                    "lesson {} is defined twice",
                    lesson.id()
                )));
            }
        }
        Ok(catalog)
    }

    /// Lesson ids referenced by feed items but missing from the catalog.
    ///
    /// These still open a lesson: lookups fall back to `LessonId::fallback()`.
    #[must_use]
    pub fn dangling_lessons(&self) -> Vec<LessonId> {
        let known: HashSet<&LessonId> = self.lessons.iter().map(Lesson::id).collect();
        let mut dangling: Vec<LessonId> = self
            .feed
            .iter()
            .filter_map(|item| item.lesson_id.as_ref())
            .filter(|id| !known.contains(id))
            .cloned()
            .collect();
        dangling.sort();
        dangling.dedup();
        dangling
    }

    /// Load the catalog into an in-memory content source.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the repository lock is poisoned.
    pub fn into_repository(self) -> Result<InMemoryRepository, StorageError> {
        let repo = InMemoryRepository::new();
        for lesson in self.lessons {
            repo.insert_lesson(lesson)?;
        }
        repo.set_feed(self.feed)?;
        Ok(repo)
    }
}
