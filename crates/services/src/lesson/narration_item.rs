use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use lesson_core::model::{LessonItemId, NarrationContent};

use crate::error::NarrationError;
use crate::narration::{NarrationService, PlayOutcome};

/// A sentence to listen to, with its translation hidden until revealed.
#[derive(Debug)]
pub struct NarrationItem {
    id: LessonItemId,
    content: NarrationContent,
    revealed: bool,
    playing: Arc<AtomicBool>,
    narration: NarrationService,
}

impl NarrationItem {
    #[must_use]
    pub fn new(id: LessonItemId, content: NarrationContent, narration: NarrationService) -> Self {
        Self {
            id,
            content,
            revealed: false,
            playing: Arc::new(AtomicBool::new(false)),
            narration,
        }
    }

    #[must_use]
    pub fn id(&self) -> &LessonItemId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.content.text
    }

    /// The translation, once revealed.
    #[must_use]
    pub fn translation(&self) -> Option<&str> {
        self.revealed.then_some(self.content.translation.as_str())
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Show or hide the translation. Revealing also plays the sentence.
    pub fn toggle_reveal(&mut self) -> Option<impl Future<Output = PlayOutcome> + Send + use<>> {
        self.revealed = !self.revealed;
        self.revealed.then(|| self.play())
    }

    /// Play the sentence through the shared narration slot.
    pub fn play(&self) -> impl Future<Output = PlayOutcome> + Send + use<> {
        let narration = self.narration.clone();
        let text = self.content.text.clone();
        let playing = Arc::clone(&self.playing);
        playing.store(true, Ordering::SeqCst);
        async move {
            let on_end = {
                let playing = Arc::clone(&playing);
                move || playing.store(false, Ordering::SeqCst)
            };
            let on_error = {
                let playing = Arc::clone(&playing);
                move |err: NarrationError| {
                    warn!(%err, "sentence narration failed");
                    playing.store(false, Ordering::SeqCst);
                }
            };
            let outcome = narration.play(&text, on_end, on_error).await;
            if outcome == PlayOutcome::Superseded {
                playing.store(false, Ordering::SeqCst);
            }
            outcome
        }
    }

    /// True while this sentence is loading or sounding.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst) && self.narration.is_narrating(&self.content.text)
    }
}
