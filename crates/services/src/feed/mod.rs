//! The scrolling media feed: which pane is active and how its video plays.

mod controller;
mod playback;
mod tracker;

pub use controller::{Activation, FeedConfig, FeedController, MediaElementFactory};
pub use playback::{ActivationOutcome, MediaElement, MediaPlaybackController, PlaybackState};
pub use tracker::{
    ActivePaneTracker, DEFAULT_INTERSECTION_THRESHOLD, IntersectionEntry, PaneObserver,
    select_active,
};
