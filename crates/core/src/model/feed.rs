use serde::{Deserialize, Serialize};

use crate::model::ids::{FeedItemId, LessonId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaLayout {
    #[default]
    Portrait,
    Landscape,
}

/// A short video in the feed and the lesson attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: FeedItemId,
    pub media_url: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub lesson_id: Option<LessonId>,
    #[serde(default)]
    pub layout: MediaLayout,
}

impl FeedItem {
    /// Lesson to open for this item, or the catalog fallback.
    #[must_use]
    pub fn lesson_or_fallback(&self) -> LessonId {
        self.lesson_id.clone().unwrap_or_else(LessonId::fallback)
    }
}

/// Default number of times the logical items are repeated to fake an endless feed.
pub const DEFAULT_FEED_REPEAT: usize = 50;

/// The scrollable feed: the logical items repeated `repeat` times.
///
/// Frames are addressed by positional index. Two frames can show the same
/// logical item, but every frame has its own position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    items: Vec<FeedItem>,
    repeat: usize,
}

impl Feed {
    #[must_use]
    pub fn new(items: Vec<FeedItem>, repeat: usize) -> Self {
        Self { items, repeat }
    }

    #[must_use]
    pub fn with_default_repeat(items: Vec<FeedItem>) -> Self {
        Self::new(items, DEFAULT_FEED_REPEAT)
    }

    #[must_use]
    pub fn logical_items(&self) -> &[FeedItem] {
        &self.items
    }

    /// Number of frames in the feed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len().saturating_mul(self.repeat)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The logical item shown at a frame position.
    #[must_use]
    pub fn item_at(&self, position: usize) -> Option<&FeedItem> {
        if position >= self.len() {
            return None;
        }
        self.items.get(position % self.items.len())
    }

    /// Frame position of `logical` within repetition `repetition`.
    #[must_use]
    pub fn position_of(&self, repetition: usize, logical: usize) -> Option<usize> {
        if repetition >= self.repeat || logical >= self.items.len() {
            return None;
        }
        Some(repetition * self.items.len() + logical)
    }
}
