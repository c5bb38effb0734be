use std::future::Future;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use lesson_core::model::{LessonItemId, QuizContent};

use crate::lesson::score::ScoreReporter;
use crate::narration::{NarrationService, PlayOutcome};

/// What a `check` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Nothing is selected yet; the item is still open.
    NothingSelected,
    Correct,
    Incorrect,
    /// The item was checked earlier; nothing changed.
    AlreadyChecked,
}

/// A multiple-choice question as the learner works through it.
#[derive(Debug)]
pub struct QuizItem {
    id: LessonItemId,
    content: QuizContent,
    options: Vec<String>,
    selected: Option<String>,
    correct: Option<bool>,
    reporter: Option<ScoreReporter>,
}

impl QuizItem {
    /// Shuffle the options once; the order is fixed for the life of the item.
    #[must_use]
    pub fn new(id: LessonItemId, content: QuizContent, reporter: ScoreReporter) -> Self {
        let mut options = content.options.clone();
        options.shuffle(&mut rand::rng());
        Self {
            id,
            content,
            options,
            selected: None,
            correct: None,
            reporter: Some(reporter),
        }
    }

    #[must_use]
    pub fn id(&self) -> &LessonItemId {
        &self.id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.content.question
    }

    /// Options in display order.
    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select `option`. Ignored once checked or for an option the item doesn't have.
    pub fn select(&mut self, option: &str) -> bool {
        if self.is_checked() || !self.options.iter().any(|o| o == option) {
            return false;
        }
        self.selected = Some(option.to_owned());
        true
    }

    /// Grade the selection and report it. Only the first graded call has any effect.
    pub fn check(&mut self) -> CheckOutcome {
        if self.is_checked() {
            return CheckOutcome::AlreadyChecked;
        }
        let Some(selected) = &self.selected else {
            return CheckOutcome::NothingSelected;
        };
        let correct = *selected == self.content.correct_answer;
        self.correct = Some(correct);
        if let Some(reporter) = self.reporter.take() {
            reporter.report(correct);
        }
        debug!(item = %self.id, correct, "quiz checked");
        if correct {
            CheckOutcome::Correct
        } else {
            CheckOutcome::Incorrect
        }
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.correct.is_some()
    }

    /// `Some(correct)` once checked.
    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.correct
    }

    /// Revealed after checking and stays revealed.
    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.correct.map(|_| self.content.explanation.as_str())
    }

    #[must_use]
    pub fn correct_answer(&self) -> Option<&str> {
        self.correct.map(|_| self.content.correct_answer.as_str())
    }

    /// Speak the correct answer. Only available after checking.
    pub fn pronounce_answer(
        &self,
        narration: &NarrationService,
    ) -> Option<impl Future<Output = PlayOutcome> + Send + use<>> {
        let text = self.correct_answer()?.to_owned();
        let narration = narration.clone();
        Some(async move {
            narration
                .play(&text, || {}, |err| warn!(%err, "answer narration failed"))
                .await
        })
    }
}
