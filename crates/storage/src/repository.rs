use async_trait::async_trait;
use lesson_core::model::{FeedItem, Lesson, LessonId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by content sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read-only access to lesson content.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError>;

    /// Fetch a lesson, falling back to `LessonId::fallback()` when `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if neither lesson exists.
    async fn get_lesson_or_fallback(&self, id: &LessonId) -> Result<Lesson, StorageError> {
        match self.get_lesson(id).await {
            Err(StorageError::NotFound) => self.get_lesson(&LessonId::fallback()).await,
            other => other,
        }
    }
}

/// Read-only access to the logical feed items.
#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// List feed items in display order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the feed cannot be read.
    async fn list_feed(&self) -> Result<Vec<FeedItem>, StorageError>;
}

/// Simple in-memory content source for tests and bundled catalogs.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    feed: Arc<Mutex<Vec<FeedItem>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a lesson. Content is supplied once at startup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn insert_lesson(&self, lesson: Lesson) -> Result<(), StorageError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(lesson.id().clone(), lesson);
        Ok(())
    }

    /// Replace the feed items.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn set_feed(&self, items: Vec<FeedItem>) -> Result<(), StorageError> {
        let mut guard = self
            .feed
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = items;
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl FeedRepository for InMemoryRepository {
    async fn list_feed(&self) -> Result<Vec<FeedItem>, StorageError> {
        let guard = self
            .feed
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

/// Aggregates lesson and feed repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct ContentSource {
    pub lessons: Arc<dyn LessonRepository>,
    pub feed: Arc<dyn FeedRepository>,
}

impl ContentSource {
    #[must_use]
    pub fn in_memory(repo: InMemoryRepository) -> Self {
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let feed: Arc<dyn FeedRepository> = Arc::new(repo);
        Self { lessons, feed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{LessonItem, NarrationContent};

    fn lesson(id: &str) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            id,
            vec![LessonItem::narration(
                "s1",
                NarrationContent {
                    text: "Waiting for content...".into(),
                    translation: "等待内容...".into(),
                    audio: None,
                },
            )],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unknown_lesson_falls_back_to_default() {
        let repo = InMemoryRepository::new();
        repo.insert_lesson(lesson("lesson_default")).unwrap();
        repo.insert_lesson(lesson("lesson_1")).unwrap();

        let direct = repo.get_lesson(&LessonId::new("lesson_1")).await.unwrap();
        assert_eq!(direct.id(), &LessonId::new("lesson_1"));

        let fallback = repo
            .get_lesson_or_fallback(&LessonId::new("lesson_404"))
            .await
            .unwrap();
        assert_eq!(fallback.id(), &LessonId::fallback());
    }

    #[tokio::test]
    async fn missing_lesson_without_fallback_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .get_lesson_or_fallback(&LessonId::new("lesson_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
