mod audio;
mod service;
mod speech;

pub use audio::{AudioClip, AudioOutput, NarrationSynthesizer, Voice};
pub use service::{NarrationService, PlayOutcome, PlaybackListener};
pub use speech::{SpeechClient, SpeechConfig};
