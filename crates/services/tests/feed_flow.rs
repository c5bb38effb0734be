mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::RecordingElement;
use lesson_core::model::{FeedItem, FeedItemId, LessonId, MediaLayout};
use services::feed::{Activation, IntersectionEntry};
use services::{
    ActivationOutcome, FeedConfig, FeedController, MediaElement, MediaElementFactory,
    PaneObserver, PlaybackState,
};

#[derive(Clone, Default)]
struct Registrations {
    live: Arc<Mutex<HashMap<usize, i32>>>,
}

impl PaneObserver for Registrations {
    fn observe(&mut self, position: usize) {
        *self.live.lock().unwrap().entry(position).or_default() += 1;
    }

    fn unobserve(&mut self, position: usize) {
        *self.live.lock().unwrap().entry(position).or_default() -= 1;
    }
}

#[derive(Default)]
struct Elements {
    made: Mutex<HashMap<usize, Arc<RecordingElement>>>,
}

impl MediaElementFactory for Elements {
    fn create(&self, position: usize, _item: &FeedItem) -> Arc<dyn MediaElement> {
        let element = Arc::new(RecordingElement::default());
        self.made.lock().unwrap().insert(position, Arc::clone(&element));
        element
    }
}

fn items() -> Vec<FeedItem> {
    (0..4)
        .map(|i| FeedItem {
            id: FeedItemId::new(format!("video_{i}")),
            media_url: format!("/videos/{i}.mp4"),
            author: "@creator".into(),
            description: String::new(),
            likes: 100,
            lesson_id: Some(LessonId::new(format!("lesson_{i}"))),
            layout: MediaLayout::Portrait,
        })
        .collect()
}

async fn settle(activation: Option<Activation>) -> ActivationOutcome {
    activation.expect("active pane should change").await
}

#[tokio::test]
async fn third_item_of_eleventh_repetition_is_the_only_one_playing() {
    let observer = Registrations::default();
    let elements = Arc::new(Elements::default());
    let mut feed = FeedController::new(
        items(),
        &FeedConfig::default(),
        observer.clone(),
        elements.clone(),
    );
    assert_eq!(feed.feed().len(), 200);

    assert_eq!(settle(feed.start()).await, ActivationOutcome::Playing);

    let outcome = settle(feed.on_intersections(&[
        IntersectionEntry::new(0, 0.0),
        IntersectionEntry::new(41, 0.35),
        IntersectionEntry::new(42, 0.65),
    ]))
    .await;
    assert_eq!(outcome, ActivationOutcome::Playing);
    assert_eq!(feed.active(), Some(42));
    assert_eq!(feed.active_lesson(), Some(LessonId::new("lesson_2")));

    assert_eq!(feed.controller(0).unwrap().state(), PlaybackState::Paused);
    assert_eq!(feed.controller(42).unwrap().state(), PlaybackState::Playing);
    assert!(feed.controller(2).is_none());
    let element = Arc::clone(&elements.made.lock().unwrap()[&42]);
    assert_eq!(element.calls(), vec!["rewind", "play"]);

    feed.teardown();
    assert!(observer.live.lock().unwrap().values().all(|count| *count == 0));
}
