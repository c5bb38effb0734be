#![forbid(unsafe_code)]

pub mod error;
pub mod feed;
pub mod lesson;
pub mod narration;
pub mod tasks;
pub mod token;

#[cfg(test)]
mod test_support;

pub use lesson_core::Clock;

pub use error::{FetchError, LessonError, MediaError, NarrationError, PlaybackError};
pub use feed::{
    ActivationOutcome, ActivePaneTracker, FeedConfig, FeedController, IntersectionEntry,
    MediaElement, MediaElementFactory, MediaPlaybackController, PaneObserver, PlaybackState,
};
pub use lesson::{
    Advance, LessonEvent, LessonProgressionEngine, LessonService, LessonTimings, LoadingSequence,
};
pub use narration::{
    AudioClip, AudioOutput, NarrationService, NarrationSynthesizer, PlayOutcome, SpeechClient,
    SpeechConfig,
};
pub use tasks::TaskGuard;
pub use token::{SessionToken, TokenSource};
