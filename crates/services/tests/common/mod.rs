#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use services::narration::{PlaybackListener, Voice};
use services::{AudioClip, AudioOutput, FetchError, MediaError, MediaElement, NarrationSynthesizer};
use services::error::PlaybackError;

/// Synthesizer that fails the first request for each text listed in `flaky`.
#[derive(Default)]
pub struct FlakySynth {
    flaky: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
}

impl FlakySynth {
    pub fn failing_once(texts: &[&str]) -> Self {
        let flaky = texts.iter().map(|t| ((*t).to_string(), 1)).collect();
        Self {
            flaky: Mutex::new(flaky),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NarrationSynthesizer for FlakySynth {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, FetchError> {
        self.calls.lock().unwrap().push(text.to_string());
        let mut flaky = self.flaky.lock().unwrap();
        if let Some(left) = flaky.get_mut(text).filter(|left| **left > 0) {
            *left -= 1;
            return Err(FetchError::ServiceUnavailable("upstream down".into()));
        }
        Ok(AudioClip::new(text.as_bytes().to_vec(), "audio/mpeg"))
    }
}

/// Output whose voices never finish on their own.
#[derive(Default, Clone)]
pub struct QuietOutput {
    started: Arc<Mutex<Vec<String>>>,
}

impl QuietOutput {
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioOutput for QuietOutput {
    async fn load(&self, clip: &AudioClip) -> Result<Box<dyn Voice>, PlaybackError> {
        Ok(Box::new(QuietVoice {
            text: String::from_utf8_lossy(clip.bytes()).into_owned(),
            started: Arc::clone(&self.started),
            listener: None,
        }))
    }
}

struct QuietVoice {
    text: String,
    started: Arc<Mutex<Vec<String>>>,
    listener: Option<PlaybackListener>,
}

impl Voice for QuietVoice {
    fn start(&mut self, listener: PlaybackListener) {
        self.started.lock().unwrap().push(self.text.clone());
        self.listener = Some(listener);
    }

    fn stop(&mut self) {
        self.listener = None;
    }
}

/// Media element that always plays and records calls.
#[derive(Default)]
pub struct RecordingElement {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingElement {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaElement for RecordingElement {
    fn rewind(&self) {
        self.calls.lock().unwrap().push("rewind");
    }

    fn set_muted(&self, _muted: bool) {}

    async fn play(&self) -> Result<(), MediaError> {
        self.calls.lock().unwrap().push("play");
        Ok(())
    }

    fn pause(&self) {
        self.calls.lock().unwrap().push("pause");
    }
}
