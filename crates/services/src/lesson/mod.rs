//! Gamified lesson sessions: item interactions, progression and scoring.

mod engine;
mod loading;
mod matching;
mod narration_item;
mod quiz;
mod score;
mod service;

pub use engine::{
    Advance, DEFAULT_SCROLL_HINT_DELAY, LessonEvent, LessonProgressionEngine, LessonTimings,
    RevealedItem,
};
pub use loading::{LoadingEvent, LoadingPlan, LoadingSequence};
pub use matching::{Column, DEFAULT_MISMATCH_CLEAR, MatchingItem, SelectOutcome};
pub use narration_item::NarrationItem;
pub use quiz::{CheckOutcome, QuizItem};
pub use score::{ScoreReporter, ScoreTally};
pub use service::{LessonService, StartedLesson};
