use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{FetchError, PlaybackError};
use crate::narration::service::PlaybackListener;

/// Encoded narration audio. Cloning shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Arc<[u8]>,
    content_type: String,
}

impl AudioClip {
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioClip")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Turns narration text into audio.
#[async_trait]
pub trait NarrationSynthesizer: Send + Sync {
    /// # Errors
    ///
    /// Returns `FetchError` when the text is missing or the service fails.
    async fn synthesize(&self, text: &str) -> Result<AudioClip, FetchError>;
}

/// Audio device the narration service plays through.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Decode a clip into a voice that is ready but silent.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::Decode` if the clip cannot be prepared.
    async fn load(&self, clip: &AudioClip) -> Result<Box<dyn Voice>, PlaybackError>;
}

/// One decoded clip on the output device.
pub trait Voice: Send {
    /// Begin sounding.
    ///
    /// The voice reports exactly one of `listener.finished()` or
    /// `listener.failed(..)`, including a failure to start, unless it is
    /// stopped first.
    fn start(&mut self, listener: PlaybackListener);

    /// Silence and release the voice. Idempotent.
    fn stop(&mut self);
}
