use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use lesson_core::model::{
    Lesson, LessonItem, LessonItemContent, LessonResult, ProgressSnapshot,
};

use crate::Clock;
use crate::error::LessonError;
use crate::lesson::matching::{DEFAULT_MISMATCH_CLEAR, MatchingItem};
use crate::lesson::narration_item::NarrationItem;
use crate::lesson::quiz::QuizItem;
use crate::lesson::score::ScoreTally;
use crate::narration::NarrationService;
use crate::tasks::TaskGuard;

/// Delay before the newly revealed item is scrolled into view.
pub const DEFAULT_SCROLL_HINT_DELAY: Duration = Duration::from_millis(100);

/// Timers and toggles for a lesson session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonTimings {
    pub scroll_hint_delay: Duration,
    pub mismatch_clear: Duration,
    pub autoplay_narration: bool,
}

impl Default for LessonTimings {
    fn default() -> Self {
        Self {
            scroll_hint_delay: DEFAULT_SCROLL_HINT_DELAY,
            mismatch_clear: DEFAULT_MISMATCH_CLEAR,
            autoplay_narration: true,
        }
    }
}

impl LessonTimings {
    #[must_use]
    pub fn with_scroll_hint_delay(mut self, delay: Duration) -> Self {
        self.scroll_hint_delay = delay;
        self
    }

    #[must_use]
    pub fn with_mismatch_clear(mut self, delay: Duration) -> Self {
        self.mismatch_clear = delay;
        self
    }

    #[must_use]
    pub fn with_autoplay_narration(mut self, autoplay: bool) -> Self {
        self.autoplay_narration = autoplay;
        self
    }
}

/// Notifications for the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonEvent {
    /// Bring the item at this index into view.
    ScrollTo(usize),
    /// The lesson is over. Sent once.
    Finished(LessonResult),
}

/// A revealed lesson item with its interaction state.
#[derive(Debug)]
pub enum RevealedItem {
    Narration(NarrationItem),
    Quiz(QuizItem),
    Matching(MatchingItem),
}

/// What `advance` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The item at this index is now visible.
    Revealed(usize),
    Finished(LessonResult),
    /// The lesson was exited before finishing; nothing changed.
    Exited,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Reveals a lesson one item at a time and totals the score.
///
/// Every timer and background task it starts is owned here and stops on
/// `exit` or drop.
#[derive(Debug)]
pub struct LessonProgressionEngine {
    lesson: Lesson,
    items: Vec<RevealedItem>,
    tally: Arc<ScoreTally>,
    total_scorable: u32,
    narration: NarrationService,
    timings: LessonTimings,
    clock: Clock,
    started_at: DateTime<Utc>,
    result: Option<LessonResult>,
    exited: bool,
    events: mpsc::UnboundedSender<LessonEvent>,
    tasks: Vec<TaskGuard>,
}

impl LessonProgressionEngine {
    /// Start a session with the first item revealed and scrolled to.
    #[must_use]
    pub fn start(
        lesson: Lesson,
        narration: NarrationService,
        clock: Clock,
        timings: LessonTimings,
    ) -> (Self, mpsc::UnboundedReceiver<LessonEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let total_scorable = u32::try_from(lesson.scorable_count()).unwrap_or(u32::MAX);
        let mut engine = Self {
            lesson,
            items: Vec::new(),
            tally: ScoreTally::shared(),
            total_scorable,
            narration,
            timings,
            started_at: clock.now(),
            clock,
            result: None,
            exited: false,
            events,
            tasks: Vec::new(),
        };
        info!(
            lesson = %engine.lesson.id(),
            items = engine.lesson.len(),
            total_scorable,
            "lesson started"
        );
        let first = engine.reveal_next();
        engine.schedule_scroll(first);
        (engine, receiver)
    }

    /// Reveal the next item, or finish once everything is visible.
    ///
    /// Finishing happens once; later calls return the same result. After
    /// `exit` nothing is revealed any more.
    pub fn advance(&mut self) -> Advance {
        if let Some(result) = &self.result {
            return Advance::Finished(result.clone());
        }
        if self.exited {
            return Advance::Exited;
        }
        if self.items.len() < self.lesson.len() {
            let index = self.reveal_next();
            self.schedule_scroll(index);
            return Advance::Revealed(index);
        }

        let result = LessonResult {
            lesson_id: self.lesson.id().clone(),
            score: self.tally.score(),
            total_scorable: self.total_scorable,
            started_at: self.started_at,
            completed_at: self.clock.now(),
        };
        info!(
            lesson = %result.lesson_id,
            score = result.score,
            total = result.total_scorable,
            "lesson finished"
        );
        self.result = Some(result.clone());
        self.send(LessonEvent::Finished(result.clone()));
        Advance::Finished(result)
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.tally.score()
    }

    #[must_use]
    pub fn total_scorable(&self) -> u32 {
        self.total_scorable
    }

    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            visible_count: self.items.len(),
            total_items: self.lesson.len(),
            score: self.tally.score(),
            total_scorable: self.total_scorable,
        }
    }

    #[must_use]
    pub fn is_exited(&self) -> bool {
        self.exited
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    #[must_use]
    pub fn result(&self) -> Option<&LessonResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn narration(&self) -> &NarrationService {
        &self.narration
    }

    /// Revealed items in lesson order.
    #[must_use]
    pub fn items(&self) -> &[RevealedItem] {
        &self.items
    }

    /// # Errors
    ///
    /// Returns `LessonError::NotRevealed` past the visible items.
    pub fn item(&self, index: usize) -> Result<&RevealedItem, LessonError> {
        self.items.get(index).ok_or(LessonError::NotRevealed(index))
    }

    /// # Errors
    ///
    /// Returns `LessonError::NotRevealed` or `LessonError::WrongKind`.
    pub fn quiz_mut(&mut self, index: usize) -> Result<&mut QuizItem, LessonError> {
        match self.item_mut(index)? {
            RevealedItem::Quiz(item) => Ok(item),
            _ => Err(LessonError::WrongKind {
                index,
                expected: "multiple choice",
            }),
        }
    }

    /// # Errors
    ///
    /// Returns `LessonError::NotRevealed` or `LessonError::WrongKind`.
    pub fn matching_mut(&mut self, index: usize) -> Result<&mut MatchingItem, LessonError> {
        match self.item_mut(index)? {
            RevealedItem::Matching(item) => Ok(item),
            _ => Err(LessonError::WrongKind {
                index,
                expected: "matching",
            }),
        }
    }

    /// # Errors
    ///
    /// Returns `LessonError::NotRevealed` or `LessonError::WrongKind`.
    pub fn narration_mut(&mut self, index: usize) -> Result<&mut NarrationItem, LessonError> {
        match self.item_mut(index)? {
            RevealedItem::Narration(item) => Ok(item),
            _ => Err(LessonError::WrongKind {
                index,
                expected: "narration",
            }),
        }
    }

    /// Leave the lesson: cancel every timer and silence narration.
    pub fn exit(&mut self) {
        self.exited = true;
        self.tasks.clear();
        for item in &mut self.items {
            if let RevealedItem::Matching(matching) = item {
                matching.teardown();
            }
        }
        self.narration.stop();
        debug!(lesson = %self.lesson.id(), "lesson exited");
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut RevealedItem, LessonError> {
        self.items
            .get_mut(index)
            .ok_or(LessonError::NotRevealed(index))
    }

    fn reveal_next(&mut self) -> usize {
        let index = self.items.len();
        let Some(item) = self.lesson.items().get(index) else {
            return index;
        };
        let kind = item.kind();
        let revealed = self.instantiate(item);
        if let RevealedItem::Narration(narration) = &revealed
            && self.timings.autoplay_narration
        {
            let play = narration.play();
            self.track(TaskGuard::spawn(async move {
                play.await;
            }));
        }
        debug!(index, ?kind, "item revealed");
        self.items.push(revealed);
        index
    }

    fn instantiate(&self, item: &LessonItem) -> RevealedItem {
        let id = item.id().clone();
        match item.content() {
            LessonItemContent::Narration(content) => RevealedItem::Narration(NarrationItem::new(
                id,
                content.clone(),
                self.narration.clone(),
            )),
            LessonItemContent::MultipleChoice(content) => {
                let reporter = self.tally.reporter(id.clone());
                RevealedItem::Quiz(QuizItem::new(id, content.clone(), reporter))
            }
            LessonItemContent::Matching(content) => {
                let reporter = self.tally.reporter(id.clone());
                RevealedItem::Matching(
                    MatchingItem::new(id, content.clone(), reporter)
                        .with_clear_delay(self.timings.mismatch_clear),
                )
            }
        }
    }

    fn schedule_scroll(&mut self, index: usize) {
        let events = self.events.clone();
        let delay = self.timings.scroll_hint_delay;
        self.track(TaskGuard::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(LessonEvent::ScrollTo(index));
        }));
    }

    fn track(&mut self, task: TaskGuard) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }

    fn send(&self, event: LessonEvent) {
        if self.events.send(event).is_err() {
            debug!("lesson events receiver dropped");
        }
    }
}
