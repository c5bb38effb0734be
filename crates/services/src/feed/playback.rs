use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::MediaError;
use crate::tasks::lock;
use crate::token::{SessionToken, TokenSource};

/// One feed pane's video element.
#[async_trait]
pub trait MediaElement: Send + Sync {
    /// Seek back to the start of the media.
    fn rewind(&self);
    fn set_muted(&self, muted: bool);
    /// Begin playback.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::AutoplayPolicy` when sound is not allowed yet, and
    /// `MediaError::Failed` for anything else.
    async fn play(&self) -> Result<(), MediaError>;
    fn pause(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Activating,
    Playing,
    PlayingMuted,
    Paused,
}

impl PlaybackState {
    #[must_use]
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::PlayingMuted)
    }
}

/// How an `activate` call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Playing,
    /// Playing without sound: refused by the platform, or muted while starting.
    PlayingMuted,
    /// The pane was already active; nothing was restarted.
    AlreadyActive,
    /// The pane was deactivated or reactivated before playback resolved.
    Superseded,
    Failed(MediaError),
}

#[derive(Debug)]
struct ControllerState {
    state: PlaybackState,
    active: bool,
    muted: bool,
    rewind_pending: bool,
    token: Option<SessionToken>,
}

struct Inner {
    position: usize,
    element: Arc<dyn MediaElement>,
    state: Mutex<ControllerState>,
    tokens: TokenSource,
}

/// Drives one pane's media element as the pane gains and loses focus.
///
/// Clones share the same element and state.
#[derive(Clone)]
pub struct MediaPlaybackController {
    inner: Arc<Inner>,
}

impl MediaPlaybackController {
    #[must_use]
    pub fn new(position: usize, element: Arc<dyn MediaElement>) -> Self {
        Self {
            inner: Arc::new(Inner {
                position,
                element,
                state: Mutex::new(ControllerState {
                    state: PlaybackState::Idle,
                    active: false,
                    muted: false,
                    rewind_pending: true,
                    token: None,
                }),
                tokens: TokenSource::new(),
            }),
        }
    }

    /// Start playback from the top, with sound if the platform allows it.
    ///
    /// Re-activating an active pane is a no-op. A deactivation or a newer
    /// activation while `play` is pending makes this call `Superseded`.
    pub async fn activate(&self) -> ActivationOutcome {
        let element = &self.inner.element;
        let (token, rewind) = {
            let mut st = lock(&self.inner.state);
            if st.active {
                return ActivationOutcome::AlreadyActive;
            }
            let token = self.inner.tokens.issue();
            st.active = true;
            st.token = Some(token);
            st.state = PlaybackState::Activating;
            st.muted = false;
            (token, std::mem::take(&mut st.rewind_pending))
        };

        if rewind {
            element.rewind();
        }
        element.set_muted(false);
        let result = match element.play().await {
            Ok(()) => Ok(false),
            Err(MediaError::AutoplayPolicy(reason)) => {
                if !self.owns(token) {
                    return self.discard(token);
                }
                debug!(position = self.inner.position, %reason, "sound blocked, retrying muted");
                element.set_muted(true);
                element.play().await.map(|()| true)
            }
            Err(err) => Err(err),
        };

        let mut st = lock(&self.inner.state);
        if st.token != Some(token) {
            drop(st);
            return self.discard(token);
        }
        match result {
            Ok(fell_back) => {
                // A mute toggled while `play` was pending stays in effect.
                st.muted |= fell_back;
                let muted = st.muted;
                st.state = if muted {
                    PlaybackState::PlayingMuted
                } else {
                    PlaybackState::Playing
                };
                info!(position = self.inner.position, muted, "media playing");
                if muted {
                    ActivationOutcome::PlayingMuted
                } else {
                    ActivationOutcome::Playing
                }
            }
            Err(err) => {
                st.state = PlaybackState::Paused;
                warn!(position = self.inner.position, %err, "media failed to play");
                ActivationOutcome::Failed(err)
            }
        }
    }

    /// Pause and mark the pane inactive. The next activation starts from the top.
    pub fn deactivate(&self) {
        {
            let mut st = lock(&self.inner.state);
            st.active = false;
            st.token = Some(self.inner.tokens.issue());
            st.state = PlaybackState::Paused;
            st.rewind_pending = true;
        }
        self.inner.element.pause();
    }

    /// Flip sound on or off. Returns whether the pane is now muted.
    pub fn toggle_mute(&self) -> bool {
        let muted = {
            let mut st = lock(&self.inner.state);
            st.muted = !st.muted;
            st.state = match st.state {
                PlaybackState::Playing | PlaybackState::PlayingMuted if st.muted => {
                    PlaybackState::PlayingMuted
                }
                PlaybackState::Playing | PlaybackState::PlayingMuted => PlaybackState::Playing,
                other => other,
            };
            st.muted
        };
        self.inner.element.set_muted(muted);
        muted
    }

    /// User tap: pause a playing pane, or resume a paused active one where it stopped.
    pub async fn toggle_play(&self) -> PlaybackState {
        let token = {
            let mut st = lock(&self.inner.state);
            let current = st.state;
            match current {
                PlaybackState::Playing | PlaybackState::PlayingMuted => {
                    st.state = PlaybackState::Paused;
                    drop(st);
                    self.inner.element.pause();
                    return PlaybackState::Paused;
                }
                PlaybackState::Paused if st.active => {
                    let token = self.inner.tokens.issue();
                    st.token = Some(token);
                    st.state = PlaybackState::Activating;
                    token
                }
                other => return other,
            }
        };

        let result = self.inner.element.play().await;

        let mut st = lock(&self.inner.state);
        if st.token != Some(token) {
            return st.state;
        }
        st.state = match result {
            Ok(()) if st.muted => PlaybackState::PlayingMuted,
            Ok(()) => PlaybackState::Playing,
            Err(err) => {
                warn!(position = self.inner.position, %err, "media failed to resume");
                PlaybackState::Paused
            }
        };
        st.state
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        lock(&self.inner.state).state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        lock(&self.inner.state).active
    }

    #[must_use]
    pub fn is_muted(&self) -> bool {
        lock(&self.inner.state).muted
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.inner.position
    }

    fn owns(&self, token: SessionToken) -> bool {
        lock(&self.inner.state).token == Some(token)
    }

    fn discard(&self, token: SessionToken) -> ActivationOutcome {
        debug!(position = self.inner.position, token = token.value(), "discarding stale activation");
        if !self.is_active() {
            self.inner.element.pause();
        }
        ActivationOutcome::Superseded
    }
}

impl std::fmt::Debug for MediaPlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaPlaybackController")
            .field("position", &self.inner.position)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
