//! Shared error types for the services crate.
//!
//! Narration and media failures never escape as faults: they reach callers
//! through callbacks or outcome values. These types describe what went wrong.

use thiserror::Error;

use storage::repository::StorageError;

/// Failure to obtain narration audio. Retrying is always allowed.
///
/// `Clone` because one in-flight fetch hands its result to every waiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FetchError {
    #[error("narration text is required")]
    MissingInput,
    #[error("speech service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("speech request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("speech request failed: {0}")]
    Network(String),
    #[error("speech service returned no audio")]
    EmptyAudio,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Failure to decode or start a narration clip.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlaybackError {
    #[error("audio could not be decoded: {0}")]
    Decode(String),
    #[error("audio could not start: {0}")]
    Start(String),
    #[error("audio stopped with an error: {0}")]
    Interrupted(String),
}

/// Delivered to narration `on_error` callbacks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NarrationError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

/// Errors reported by a media element when asked to play.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MediaError {
    /// Unmuted playback was refused by the autoplay policy. Recovered by retrying muted.
    #[error("autoplay with sound was rejected: {0}")]
    AutoplayPolicy(String),
    #[error("media playback failed: {0}")]
    Failed(String),
}

/// Errors emitted by lesson services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonError {
    #[error("no revealed item at index {0}")]
    NotRevealed(usize),
    #[error("item {index} is not a {expected} item")]
    WrongKind { index: usize, expected: &'static str },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
