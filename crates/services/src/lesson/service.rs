use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use lesson_core::model::{Lesson, LessonId, LessonItemContent};
use storage::repository::LessonRepository;

use crate::Clock;
use crate::error::LessonError;
use crate::lesson::engine::{LessonEvent, LessonProgressionEngine, LessonTimings};
use crate::narration::NarrationService;

/// A running lesson and the channel its events arrive on.
pub type StartedLesson = (LessonProgressionEngine, mpsc::UnboundedReceiver<LessonEvent>);

/// Opens lessons from storage and wires them to the session's narration service.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    lessons: Arc<dyn LessonRepository>,
    narration: NarrationService,
    timings: LessonTimings,
    preload: bool,
}

impl LessonService {
    #[must_use]
    pub fn new(clock: Clock, lessons: Arc<dyn LessonRepository>, narration: NarrationService) -> Self {
        Self {
            clock,
            lessons,
            narration,
            timings: LessonTimings::default(),
            preload: false,
        }
    }

    #[must_use]
    pub fn with_timings(mut self, timings: LessonTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Fetch every narration clip of a lesson before it starts.
    #[must_use]
    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    /// Start the lesson `id`, or the default lesson when `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::Storage` when neither lesson can be loaded.
    pub async fn start_lesson(&self, id: &LessonId) -> Result<StartedLesson, LessonError> {
        let lesson = self.lessons.get_lesson_or_fallback(id).await?;
        if lesson.id() != id {
            info!(requested = %id, using = %lesson.id(), "lesson not found, using fallback");
        }
        if self.preload {
            self.narration.preload(narration_texts(&lesson)).await;
        }
        Ok(LessonProgressionEngine::start(
            lesson,
            self.narration.clone(),
            self.clock,
            self.timings.clone(),
        ))
    }
}

fn narration_texts(lesson: &Lesson) -> Vec<&str> {
    lesson
        .items()
        .iter()
        .filter_map(|item| match item.content() {
            LessonItemContent::Narration(content) => Some(content.text.as_str()),
            LessonItemContent::MultipleChoice(_) | LessonItemContent::Matching(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeOutput, FakeSynthesizer};
    use lesson_core::model::{LessonItem, NarrationContent};
    use lesson_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, StorageError};

    fn narration_lesson(id: &str, text: &str) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            "",
            vec![LessonItem::narration(
                "n1",
                NarrationContent {
                    text: text.into(),
                    translation: String::new(),
                    audio: None,
                },
            )],
        )
        .unwrap()
    }

    fn service(repo: InMemoryRepository, synth: &Arc<FakeSynthesizer>) -> LessonService {
        let narration = NarrationService::new(synth.clone(), Arc::new(FakeOutput::new()));
        LessonService::new(fixed_clock(), Arc::new(repo), narration)
            .with_timings(LessonTimings::default().with_autoplay_narration(false))
    }

    #[tokio::test]
    async fn unknown_lesson_opens_the_default() {
        let repo = InMemoryRepository::new();
        repo.insert_lesson(narration_lesson("lesson_default", "Welcome")).unwrap();
        let synth = Arc::new(FakeSynthesizer::new());

        let (engine, _events) = service(repo, &synth)
            .start_lesson(&LessonId::new("lesson_404"))
            .await
            .unwrap();
        assert_eq!(engine.lesson().id().as_str(), "lesson_default");
    }

    #[tokio::test]
    async fn missing_default_is_a_storage_error() {
        let synth = Arc::new(FakeSynthesizer::new());
        let err = service(InMemoryRepository::new(), &synth)
            .start_lesson(&LessonId::new("lesson_404"))
            .await
            .unwrap_err();
        assert!(matches!(err, LessonError::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn preload_warms_narration_cache() {
        let repo = InMemoryRepository::new();
        repo.insert_lesson(narration_lesson("lesson_1", "Good night")).unwrap();
        let synth = Arc::new(FakeSynthesizer::new());
        let lessons = service(repo, &synth).with_preload(true);

        let (engine, _events) = lessons.start_lesson(&LessonId::new("lesson_1")).await.unwrap();
        assert!(engine.narration().is_cached("Good night"));
        assert_eq!(synth.calls_for("Good night"), 1);
    }
}
