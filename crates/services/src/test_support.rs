//! Fakes shared by the unit tests in this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{FetchError, MediaError, NarrationError, PlaybackError};
use crate::feed::MediaElement;
use crate::narration::{AudioClip, AudioOutput, NarrationSynthesizer, PlaybackListener, Voice};
use crate::tasks::lock;

//
// ─── SYNTHESIZER ───────────────────────────────────────────────────────────────
//

/// Returns the text itself as audio bytes, after an optional per-text delay.
#[derive(Default)]
pub struct FakeSynthesizer {
    delays: HashMap<String, Duration>,
    failures: Mutex<HashMap<String, VecDeque<FetchError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, text: &str, delay: Duration) -> Self {
        self.delays.insert(text.to_string(), delay);
        self
    }

    pub fn fail_next(&self, text: &str, err: FetchError) {
        lock(&self.failures)
            .entry(text.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn calls_for(&self, text: &str) -> usize {
        lock(&self.calls).iter().filter(|t| *t == text).count()
    }
}

#[async_trait]
impl NarrationSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, FetchError> {
        lock(&self.calls).push(text.to_string());
        if let Some(delay) = self.delays.get(text) {
            tokio::time::sleep(*delay).await;
        }
        let failure = lock(&self.failures)
            .get_mut(text)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(AudioClip::new(text.as_bytes().to_vec(), "audio/mpeg")),
        }
    }
}

//
// ─── OUTPUT ────────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct OutputLog {
    started: Vec<String>,
    stopped: Vec<String>,
    listeners: HashMap<String, PlaybackListener>,
}

/// Records what was started and stopped; playback ends only when a test says so.
#[derive(Default)]
pub struct FakeOutput {
    log: Arc<Mutex<OutputLog>>,
    fail_load: bool,
    fail_start: bool,
}

impl FakeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn started(&self) -> Vec<String> {
        lock(&self.log).started.clone()
    }

    pub fn stopped(&self) -> Vec<String> {
        lock(&self.log).stopped.clone()
    }

    /// Report natural completion of the clip for `text`, even if it was stopped.
    pub fn finish(&self, text: &str) {
        let listener = lock(&self.log).listeners.remove(text);
        if let Some(listener) = listener {
            listener.finished();
        }
    }
}

#[async_trait]
impl AudioOutput for FakeOutput {
    async fn load(&self, clip: &AudioClip) -> Result<Box<dyn Voice>, PlaybackError> {
        if self.fail_load {
            return Err(PlaybackError::Decode("unsupported format".into()));
        }
        Ok(Box::new(FakeVoice {
            text: String::from_utf8_lossy(clip.bytes()).into_owned(),
            log: Arc::clone(&self.log),
            fail_start: self.fail_start,
        }))
    }
}

struct FakeVoice {
    text: String,
    log: Arc<Mutex<OutputLog>>,
    fail_start: bool,
}

impl Voice for FakeVoice {
    fn start(&mut self, listener: PlaybackListener) {
        if self.fail_start {
            listener.failed(PlaybackError::Start("device busy".into()));
            return;
        }
        let mut log = lock(&self.log);
        log.started.push(self.text.clone());
        log.listeners.insert(self.text.clone(), listener);
    }

    fn stop(&mut self) {
        lock(&self.log).stopped.push(self.text.clone());
    }
}

//
// ─── CALLBACK RECORDER ─────────────────────────────────────────────────────────
//

#[derive(Clone, Default)]
pub struct Recorder {
    ended: Arc<Mutex<usize>>,
    errors: Arc<Mutex<Vec<NarrationError>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_end(&self) -> impl FnOnce() + Send + 'static {
        let ended = Arc::clone(&self.ended);
        move || *lock(&ended) += 1
    }

    pub fn on_error(&self) -> impl FnOnce(NarrationError) + Send + 'static {
        let errors = Arc::clone(&self.errors);
        move |err| lock(&errors).push(err)
    }

    pub fn ended(&self) -> usize {
        *lock(&self.ended)
    }

    pub fn errors(&self) -> Vec<NarrationError> {
        lock(&self.errors).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.ended() == 0 && lock(&self.errors).is_empty()
    }
}

//
// ─── MEDIA ELEMENT ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Default)]
struct MediaLog {
    calls: Vec<String>,
    muted: bool,
    paused: bool,
    position_reset: usize,
}

/// Media element that rejects unmuted play when `blocks_sound` is set.
#[derive(Default)]
pub struct FakeMediaElement {
    log: Mutex<MediaLog>,
    blocks_sound: bool,
    broken: bool,
    play_delay: Option<Duration>,
}

impl FakeMediaElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blocking_sound(mut self) -> Self {
        self.blocks_sound = true;
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    pub fn with_play_delay(mut self, delay: Duration) -> Self {
        self.play_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.log).calls.clone()
    }

    pub fn rewinds(&self) -> usize {
        lock(&self.log).position_reset
    }

    pub fn is_muted(&self) -> bool {
        lock(&self.log).muted
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.log).paused
    }
}

#[async_trait]
impl MediaElement for FakeMediaElement {
    fn rewind(&self) {
        let mut log = lock(&self.log);
        log.position_reset += 1;
        log.calls.push("rewind".into());
    }

    fn set_muted(&self, muted: bool) {
        let mut log = lock(&self.log);
        log.muted = muted;
        log.calls.push(format!("muted={muted}"));
    }

    async fn play(&self) -> Result<(), MediaError> {
        let muted = {
            let mut log = lock(&self.log);
            log.calls.push("play".into());
            log.muted
        };
        if let Some(delay) = self.play_delay {
            tokio::time::sleep(delay).await;
        }
        if self.broken {
            return Err(MediaError::Failed("source not supported".into()));
        }
        if self.blocks_sound && !muted {
            return Err(MediaError::AutoplayPolicy("user has not interacted".into()));
        }
        lock(&self.log).paused = false;
        Ok(())
    }

    fn pause(&self) {
        let mut log = lock(&self.log);
        log.paused = true;
        log.calls.push("pause".into());
    }
}
