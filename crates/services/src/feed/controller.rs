use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info};

use lesson_core::model::{DEFAULT_FEED_REPEAT, Feed, FeedItem, LessonId};

use crate::feed::playback::{ActivationOutcome, MediaElement, MediaPlaybackController};
use crate::feed::tracker::{
    ActivePaneTracker, DEFAULT_INTERSECTION_THRESHOLD, IntersectionEntry, PaneObserver,
};

/// Runtime knobs for the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub intersection_threshold: f64,
    pub repeat: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            intersection_threshold: DEFAULT_INTERSECTION_THRESHOLD,
            repeat: DEFAULT_FEED_REPEAT,
        }
    }
}

impl FeedConfig {
    #[must_use]
    pub fn with_intersection_threshold(mut self, threshold: f64) -> Self {
        self.intersection_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Builds the media element for a frame the first time it becomes active.
pub trait MediaElementFactory: Send + Sync {
    fn create(&self, position: usize, item: &FeedItem) -> Arc<dyn MediaElement>;
}

/// Pending activation of the newly active pane. The caller drives or spawns it.
pub type Activation = BoxFuture<'static, ActivationOutcome>;

/// Connects the active-pane tracker to per-frame playback controllers.
pub struct FeedController<O: PaneObserver> {
    feed: Feed,
    tracker: ActivePaneTracker<O>,
    factory: Arc<dyn MediaElementFactory>,
    controllers: HashMap<usize, MediaPlaybackController>,
}

impl<O: PaneObserver> FeedController<O> {
    /// Build the feed and register every frame with `observer`.
    #[must_use]
    pub fn new(
        items: Vec<FeedItem>,
        config: &FeedConfig,
        observer: O,
        factory: Arc<dyn MediaElementFactory>,
    ) -> Self {
        let feed = Feed::new(items, config.repeat);
        let mut tracker = ActivePaneTracker::new(observer, config.intersection_threshold);
        tracker.attach(0..feed.len());
        info!(frames = feed.len(), "feed ready");
        Self {
            feed,
            tracker,
            factory,
            controllers: HashMap::new(),
        }
    }

    /// Activate the initial pane.
    pub fn start(&mut self) -> Option<Activation> {
        let position = self.tracker.active()?;
        let controller = self.controller_for(position)?;
        Some(async move { controller.activate().await }.boxed())
    }

    /// Feed visibility reports in. When the active pane changes, the old one is
    /// paused before this returns and the new one's activation is handed back.
    pub fn on_intersections(&mut self, entries: &[IntersectionEntry]) -> Option<Activation> {
        let previous = self.tracker.active();
        let next = self.tracker.on_intersections(entries)?;
        if let Some(old) = previous.and_then(|p| self.controllers.get(&p)) {
            old.deactivate();
        }
        debug!(position = next, lesson = ?self.lesson_at(next), "activating pane");
        let controller = self.controller_for(next)?;
        Some(async move { controller.activate().await }.boxed())
    }

    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.tracker.active()
    }

    #[must_use]
    pub fn active_item(&self) -> Option<&FeedItem> {
        self.feed.item_at(self.tracker.active()?)
    }

    /// Lesson to enter from the active pane.
    #[must_use]
    pub fn active_lesson(&self) -> Option<LessonId> {
        self.active_item().map(FeedItem::lesson_or_fallback)
    }

    #[must_use]
    pub fn lesson_at(&self, position: usize) -> Option<LessonId> {
        self.feed.item_at(position).map(FeedItem::lesson_or_fallback)
    }

    #[must_use]
    pub fn controller(&self, position: usize) -> Option<&MediaPlaybackController> {
        self.controllers.get(&position)
    }

    #[must_use]
    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        self.tracker.observer()
    }

    /// Pause every pane and unregister every frame.
    pub fn teardown(&mut self) {
        for controller in self.controllers.values() {
            if controller.is_active() {
                controller.deactivate();
            }
        }
        self.controllers.clear();
        self.tracker.teardown();
    }

    fn controller_for(&mut self, position: usize) -> Option<MediaPlaybackController> {
        if let Some(existing) = self.controllers.get(&position) {
            return Some(existing.clone());
        }
        let item = self.feed.item_at(position)?;
        let controller = MediaPlaybackController::new(position, self.factory.create(position, item));
        self.controllers.insert(position, controller.clone());
        Some(controller)
    }
}
