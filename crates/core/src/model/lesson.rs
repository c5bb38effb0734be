use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{LessonId, LessonItemId, PairId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("lesson {0} has no items")]
    EmptyLesson(LessonId),

    #[error("item id {0} appears more than once")]
    DuplicateItemId(LessonItemId),

    #[error("item {0} has blank text")]
    BlankText(LessonItemId),

    #[error("item {item} needs at least two options, got {count}")]
    TooFewOptions { item: LessonItemId, count: usize },

    #[error("item {item} lists option {option:?} twice")]
    DuplicateOption { item: LessonItemId, option: String },

    #[error("item {0}: correct answer is not one of the options")]
    CorrectAnswerMissing(LessonItemId),

    #[error("item {0} has no pairs")]
    NoPairs(LessonItemId),

    #[error("item {item}: pair id {pair} appears more than once")]
    DuplicatePair { item: LessonItemId, pair: PairId },

    #[error("item {item}: tile {value:?} appears more than once in its column")]
    DuplicateTile { item: LessonItemId, value: String },
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

/// A sentence read aloud, with its translation hidden until revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationContent {
    pub text: String,
    pub translation: String,
    /// Pre-rendered audio reference; synthesized on demand when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizContent {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchPair {
    pub id: PairId,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingContent {
    pub pairs: Vec<MatchPair>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LessonItemKind {
    Narration,
    MultipleChoice,
    Matching,
}

impl LessonItemKind {
    /// Multiple-choice and matching items contribute to the score.
    #[must_use]
    pub fn is_scorable(self) -> bool {
        matches!(self, Self::MultipleChoice | Self::Matching)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonItemContent {
    Narration(NarrationContent),
    MultipleChoice(QuizContent),
    Matching(MatchingContent),
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// One step of a lesson.
///
/// Serialized as `{"id": .., "type": "narration" | "multiple_choice" | "matching", "content": {..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LessonItemRecord", into = "LessonItemRecord")]
pub struct LessonItem {
    id: LessonItemId,
    content: LessonItemContent,
}

impl LessonItem {
    #[must_use]
    pub fn new(id: LessonItemId, content: LessonItemContent) -> Self {
        Self { id, content }
    }

    #[must_use]
    pub fn narration(id: impl Into<String>, content: NarrationContent) -> Self {
        Self::new(LessonItemId::new(id), LessonItemContent::Narration(content))
    }

    #[must_use]
    pub fn multiple_choice(id: impl Into<String>, content: QuizContent) -> Self {
        Self::new(LessonItemId::new(id), LessonItemContent::MultipleChoice(content))
    }

    #[must_use]
    pub fn matching(id: impl Into<String>, content: MatchingContent) -> Self {
        Self::new(LessonItemId::new(id), LessonItemContent::Matching(content))
    }

    #[must_use]
    pub fn id(&self) -> &LessonItemId {
        &self.id
    }

    #[must_use]
    pub fn content(&self) -> &LessonItemContent {
        &self.content
    }

    #[must_use]
    pub fn kind(&self) -> LessonItemKind {
        match self.content {
            LessonItemContent::Narration(_) => LessonItemKind::Narration,
            LessonItemContent::MultipleChoice(_) => LessonItemKind::MultipleChoice,
            LessonItemContent::Matching(_) => LessonItemKind::Matching,
        }
    }

    #[must_use]
    pub fn is_scorable(&self) -> bool {
        self.kind().is_scorable()
    }

    /// Check the item's content for shapes the interactive logic cannot handle.
    ///
    /// # Errors
    ///
    /// Returns the first `ContentError` found.
    pub fn validate(&self) -> Result<(), ContentError> {
        let blank = || ContentError::BlankText(self.id.clone());
        match &self.content {
            LessonItemContent::Narration(n) => {
                if n.text.trim().is_empty() {
                    return Err(blank());
                }
            }
            LessonItemContent::MultipleChoice(q) => {
                if q.question.trim().is_empty() {
                    return Err(blank());
                }
                if q.options.len() < 2 {
                    return Err(ContentError::TooFewOptions {
                        item: self.id.clone(),
                        count: q.options.len(),
                    });
                }
                let mut seen = HashSet::new();
                for option in &q.options {
                    if option.trim().is_empty() {
                        return Err(blank());
                    }
                    if !seen.insert(option.as_str()) {
                        return Err(ContentError::DuplicateOption {
                            item: self.id.clone(),
                            option: option.clone(),
                        });
                    }
                }
                if !seen.contains(q.correct_answer.as_str()) {
                    return Err(ContentError::CorrectAnswerMissing(self.id.clone()));
                }
            }
            LessonItemContent::Matching(m) => {
                if m.pairs.is_empty() {
                    return Err(ContentError::NoPairs(self.id.clone()));
                }
                let mut ids = HashSet::new();
                let mut lefts = HashSet::new();
                let mut rights = HashSet::new();
                for pair in &m.pairs {
                    if !ids.insert(&pair.id) {
                        return Err(ContentError::DuplicatePair {
                            item: self.id.clone(),
                            pair: pair.id.clone(),
                        });
                    }
                    if pair.left.trim().is_empty() || pair.right.trim().is_empty() {
                        return Err(blank());
                    }
                    // Tiles are selected by value, so a repeated value would be ambiguous.
                    for (value, column) in [(&pair.left, &mut lefts), (&pair.right, &mut rights)] {
                        if !column.insert(value.as_str()) {
                            return Err(ContentError::DuplicateTile {
                                item: self.id.clone(),
                                value: value.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LessonItemRecord {
    Narration {
        id: LessonItemId,
        content: NarrationContent,
    },
    MultipleChoice {
        id: LessonItemId,
        content: QuizContent,
    },
    Matching {
        id: LessonItemId,
        content: MatchingContent,
    },
}

impl From<LessonItemRecord> for LessonItem {
    fn from(record: LessonItemRecord) -> Self {
        match record {
            LessonItemRecord::Narration { id, content } => {
                Self::new(id, LessonItemContent::Narration(content))
            }
            LessonItemRecord::MultipleChoice { id, content } => {
                Self::new(id, LessonItemContent::MultipleChoice(content))
            }
            LessonItemRecord::Matching { id, content } => {
                Self::new(id, LessonItemContent::Matching(content))
            }
        }
    }
}

impl From<LessonItem> for LessonItemRecord {
    fn from(item: LessonItem) -> Self {
        let LessonItem { id, content } = item;
        match content {
            LessonItemContent::Narration(content) => Self::Narration { id, content },
            LessonItemContent::MultipleChoice(content) => Self::MultipleChoice { id, content },
            LessonItemContent::Matching(content) => Self::Matching { id, content },
        }
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// An ordered, validated sequence of lesson items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LessonRecord", into = "LessonRecord")]
pub struct Lesson {
    id: LessonId,
    title: String,
    items: Vec<LessonItem>,
}

impl Lesson {
    /// # Errors
    ///
    /// Returns `ContentError::EmptyLesson` for an empty item list,
    /// `ContentError::DuplicateItemId` for repeated ids, or any item validation error.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        items: Vec<LessonItem>,
    ) -> Result<Self, ContentError> {
        if items.is_empty() {
            return Err(ContentError::EmptyLesson(id));
        }
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id()) {
                return Err(ContentError::DuplicateItemId(item.id().clone()));
            }
            item.validate()?;
        }
        Ok(Self {
            id,
            title: title.into(),
            items,
        })
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn items(&self) -> &[LessonItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a constructed lesson; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items that contribute to the score.
    #[must_use]
    pub fn scorable_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_scorable()).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LessonRecord {
    id: LessonId,
    #[serde(default)]
    title: String,
    items: Vec<LessonItem>,
}

impl TryFrom<LessonRecord> for Lesson {
    type Error = ContentError;

    fn try_from(record: LessonRecord) -> Result<Self, Self::Error> {
        Lesson::new(record.id, record.title, record.items)
    }
}

impl From<Lesson> for LessonRecord {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title,
            items: lesson.items,
        }
    }
}
