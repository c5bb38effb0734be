use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use tracing::{debug, info, warn};

use crate::error::{FetchError, NarrationError, PlaybackError};
use crate::narration::audio::{AudioClip, AudioOutput, NarrationSynthesizer, Voice};
use crate::tasks::lock;
use crate::token::{SessionToken, TokenSource};

type SharedFetch = Shared<BoxFuture<'static, Result<AudioClip, FetchError>>>;
type OnEnd = Box<dyn FnOnce() + Send>;
type OnError = Box<dyn FnOnce(NarrationError) + Send>;

//
// ─── CACHE ─────────────────────────────────────────────────────────────────────
//

enum CacheEntry {
    /// One fetch in flight for this text; every caller awaits the same future.
    Pending { fetch_id: u64, fetch: SharedFetch },
    Ready(AudioClip),
}

//
// ─── PLAYBACK SLOT ─────────────────────────────────────────────────────────────
//

enum SlotState {
    Idle,
    Loading { text: String },
    Playing { text: String, voice: Box<dyn Voice> },
}

/// The one place narration can sound from. `token` belongs to the latest
/// `play` or `stop`; older requests lose the right to touch the slot.
struct PlaybackSlot {
    token: Option<SessionToken>,
    state: SlotState,
    last_failed: Option<SessionToken>,
}

impl PlaybackSlot {
    fn owned_by(&self, token: SessionToken) -> bool {
        self.token == Some(token)
    }

    fn take_voice(&mut self) -> Option<Box<dyn Voice>> {
        match std::mem::replace(&mut self.state, SlotState::Idle) {
            SlotState::Playing { voice, .. } => Some(voice),
            SlotState::Idle | SlotState::Loading { .. } => None,
        }
    }
}

/// Held by an in-flight `play`. If that future is dropped while its claim is
/// still loading, the slot goes back to idle.
struct LoadingClaim<'a> {
    slot: &'a Mutex<PlaybackSlot>,
    token: SessionToken,
}

impl Drop for LoadingClaim<'_> {
    fn drop(&mut self) {
        let mut slot = lock(self.slot);
        if slot.owned_by(self.token) && matches!(slot.state, SlotState::Loading { .. }) {
            debug!(token = self.token.value(), "narration dropped while loading");
            slot.state = SlotState::Idle;
        }
    }
}

struct Callbacks {
    on_end: OnEnd,
    on_error: OnError,
}

impl Callbacks {
    fn ended(self) {
        (self.on_end)();
    }

    fn failed(self, err: NarrationError) {
        (self.on_error)(err);
    }
}

/// Handed to a `Voice` when it starts. Reports how playback ended.
///
/// Reports from a session that has since been stopped or replaced are dropped
/// without invoking the caller's callbacks.
pub struct PlaybackListener {
    token: SessionToken,
    slot: Weak<Mutex<PlaybackSlot>>,
    callbacks: Option<Callbacks>,
}

impl PlaybackListener {
    pub fn finished(mut self) {
        if let Some(callbacks) = self.settle(false) {
            callbacks.ended();
        }
    }

    pub fn failed(mut self, err: PlaybackError) {
        if let Some(callbacks) = self.settle(true) {
            warn!(%err, "narration playback failed");
            callbacks.failed(err.into());
        }
    }

    fn settle(&mut self, failed: bool) -> Option<Callbacks> {
        let slot = self.slot.upgrade()?;
        let finished_voice = {
            let mut slot = lock(&slot);
            if !slot.owned_by(self.token) {
                debug!(token = self.token.value(), "ignoring report from a replaced narration");
                return None;
            }
            if failed {
                slot.last_failed = Some(self.token);
            }
            slot.take_voice()
        };
        drop(finished_voice);
        self.callbacks.take()
    }
}

impl fmt::Debug for PlaybackListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackListener")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// What became of a `play` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Audio started under this session token.
    Started(SessionToken),
    /// A newer `play` or `stop` took the slot first; nothing was started.
    Superseded,
    /// Fetch, decode, or start failed; `on_error` has been called.
    Failed,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

struct Inner {
    synthesizer: Arc<dyn NarrationSynthesizer>,
    output: Arc<dyn AudioOutput>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    slot: Arc<Mutex<PlaybackSlot>>,
    tokens: TokenSource,
    fetch_ids: AtomicU64,
}

/// Narration audio cache and the single playback slot for a session.
///
/// Create one per session and hand clones to every consumer; clones share the
/// cache and the slot. Call `shutdown` when the session ends.
#[derive(Clone)]
pub struct NarrationService {
    inner: Arc<Inner>,
}

impl NarrationService {
    #[must_use]
    pub fn new(synthesizer: Arc<dyn NarrationSynthesizer>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            inner: Arc::new(Inner {
                synthesizer,
                output,
                cache: Mutex::new(HashMap::new()),
                slot: Arc::new(Mutex::new(PlaybackSlot {
                    token: None,
                    state: SlotState::Idle,
                    last_failed: None,
                })),
                tokens: TokenSource::new(),
                fetch_ids: AtomicU64::new(0),
            }),
        }
    }

    /// Audio for `text`, from cache when ready.
    ///
    /// Concurrent requests for the same text share a single fetch. A failed
    /// fetch leaves nothing behind, so the next request tries again.
    ///
    /// # Errors
    ///
    /// Returns the `FetchError` from the synthesizer.
    pub async fn request_audio(&self, text: &str) -> Result<AudioClip, FetchError> {
        let (fetch_id, fetch) = {
            let mut cache = lock(&self.inner.cache);
            match cache.entry(text.to_owned()) {
                Entry::Occupied(entry) => match entry.get() {
                    CacheEntry::Ready(clip) => return Ok(clip.clone()),
                    CacheEntry::Pending { fetch_id, fetch } => (*fetch_id, fetch.clone()),
                },
                Entry::Vacant(entry) => {
                    let fetch_id = self.inner.fetch_ids.fetch_add(1, Ordering::Relaxed);
                    let synthesizer = Arc::clone(&self.inner.synthesizer);
                    let owned = text.to_owned();
                    debug!(text = %owned, "fetching narration");
                    let fetch = async move { synthesizer.synthesize(&owned).await }
                        .boxed()
                        .shared();
                    entry.insert(CacheEntry::Pending {
                        fetch_id,
                        fetch: fetch.clone(),
                    });
                    (fetch_id, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut cache = lock(&self.inner.cache);
        // Only the entry this fetch created may be settled; `clear_cache` can drop it mid-flight.
        let owns_entry = matches!(
            cache.get(text),
            Some(CacheEntry::Pending { fetch_id: id, .. }) if *id == fetch_id
        );
        if owns_entry {
            match &result {
                Ok(clip) => {
                    cache.insert(text.to_owned(), CacheEntry::Ready(clip.clone()));
                }
                Err(err) => {
                    warn!(%err, text, "narration fetch failed");
                    cache.remove(text);
                }
            }
        }
        result
    }

    /// Play `text`, silencing whatever narration is sounding.
    ///
    /// The previous narration stops before this call first yields. If another
    /// `play` or `stop` arrives while the audio is still being fetched or
    /// decoded, this request is discarded and never sounds. Failures go to
    /// `on_error`; `on_end` fires when playback completes. Neither fires for a
    /// request that gets superseded.
    pub async fn play<E, F>(&self, text: &str, on_end: E, on_error: F) -> PlayOutcome
    where
        E: FnOnce() + Send + 'static,
        F: FnOnce(NarrationError) + Send + 'static,
    {
        let callbacks = Callbacks {
            on_end: Box::new(on_end),
            on_error: Box::new(on_error),
        };
        let token = self.claim_slot(text);
        let _claim = LoadingClaim {
            slot: &self.inner.slot,
            token,
        };

        let clip = match self.request_audio(text).await {
            Ok(clip) => clip,
            Err(err) => return self.fail_claim(token, callbacks, err.into()),
        };
        if !self.owns_slot(token) {
            debug!(token = token.value(), text, "discarding stale narration fetch");
            return PlayOutcome::Superseded;
        }

        let mut voice = match self.inner.output.load(&clip).await {
            Ok(voice) => voice,
            Err(err) => return self.fail_claim(token, callbacks, err.into()),
        };
        if !self.owns_slot(token) {
            debug!(token = token.value(), text, "discarding stale narration voice");
            return PlayOutcome::Superseded;
        }

        // The voice may report back synchronously, so the slot is unlocked while it starts.
        voice.start(PlaybackListener {
            token,
            slot: Arc::downgrade(&self.inner.slot),
            callbacks: Some(callbacks),
        });

        let mut slot = lock(&self.inner.slot);
        if !slot.owned_by(token) {
            drop(slot);
            voice.stop();
            return PlayOutcome::Superseded;
        }
        if slot.last_failed == Some(token) {
            return PlayOutcome::Failed;
        }
        if matches!(slot.state, SlotState::Loading { .. }) {
            slot.state = SlotState::Playing {
                text: text.to_owned(),
                voice,
            };
            info!(token = token.value(), "narration started");
        }
        PlayOutcome::Started(token)
    }

    /// Silence and release the playback slot. Also cancels a `play` still loading.
    pub fn stop(&self) {
        let voice = {
            let mut slot = lock(&self.inner.slot);
            slot.token = Some(self.inner.tokens.issue());
            slot.take_voice()
        };
        if let Some(mut voice) = voice {
            voice.stop();
        }
    }

    /// Release every cached clip and stop playback.
    pub fn clear_cache(&self) {
        let released = {
            let mut cache = lock(&self.inner.cache);
            let len = cache.len();
            cache.clear();
            len
        };
        self.stop();
        info!(released, "narration cache cleared");
    }

    /// End of session: release everything this service holds.
    pub fn shutdown(&self) {
        self.clear_cache();
    }

    /// Warm the cache. Failures are logged and otherwise ignored.
    pub async fn preload<I, S>(&self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let texts: Vec<S> = texts.into_iter().collect();
        let results = join_all(texts.iter().map(|text| self.request_audio(text.as_ref()))).await;
        for (text, result) in texts.iter().zip(results) {
            if let Err(err) = result {
                warn!(%err, text = text.as_ref(), "narration preload failed");
            }
        }
    }

    /// True while a clip is audibly playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        matches!(lock(&self.inner.slot).state, SlotState::Playing { .. })
    }

    /// True while `text` is loading or playing in the slot.
    #[must_use]
    pub fn is_narrating(&self, text: &str) -> bool {
        match &lock(&self.inner.slot).state {
            SlotState::Loading { text: current } | SlotState::Playing { text: current, .. } => {
                current == text
            }
            SlotState::Idle => false,
        }
    }

    /// Text currently loading or playing in the slot.
    #[must_use]
    pub fn now_playing(&self) -> Option<String> {
        match &lock(&self.inner.slot).state {
            SlotState::Loading { text } | SlotState::Playing { text, .. } => Some(text.clone()),
            SlotState::Idle => None,
        }
    }

    #[must_use]
    pub fn is_cached(&self, text: &str) -> bool {
        matches!(lock(&self.inner.cache).get(text), Some(CacheEntry::Ready(_)))
    }

    /// Number of ready clips in the cache.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        lock(&self.inner.cache)
            .values()
            .filter(|entry| matches!(entry, CacheEntry::Ready(_)))
            .count()
    }

    fn claim_slot(&self, text: &str) -> SessionToken {
        let (token, previous) = {
            let mut slot = lock(&self.inner.slot);
            let token = self.inner.tokens.issue();
            slot.token = Some(token);
            let previous = slot.take_voice();
            slot.state = SlotState::Loading {
                text: text.to_owned(),
            };
            (token, previous)
        };
        if let Some(mut voice) = previous {
            voice.stop();
        }
        token
    }

    fn owns_slot(&self, token: SessionToken) -> bool {
        lock(&self.inner.slot).owned_by(token)
    }

    fn fail_claim(
        &self,
        token: SessionToken,
        callbacks: Callbacks,
        err: NarrationError,
    ) -> PlayOutcome {
        {
            let mut slot = lock(&self.inner.slot);
            if !slot.owned_by(token) {
                debug!(token = token.value(), %err, "dropping failure of a replaced narration");
                return PlayOutcome::Superseded;
            }
            slot.state = SlotState::Idle;
            slot.last_failed = Some(token);
        }
        warn!(%err, "narration failed");
        callbacks.failed(err);
        PlayOutcome::Failed
    }
}

impl fmt::Debug for NarrationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrationService")
            .field("cached", &self.cached_len())
            .field("playing", &self.is_playing())
            .finish_non_exhaustive()
    }
}
