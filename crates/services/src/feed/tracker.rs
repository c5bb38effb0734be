use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

/// Default visibility ratio a pane must reach to become active.
pub const DEFAULT_INTERSECTION_THRESHOLD: f64 = 0.6;

/// The platform primitive that reports pane visibility.
///
/// Registrations are keyed by positional index. The tracker pairs every
/// `observe` with exactly one `unobserve`.
pub trait PaneObserver: Send {
    fn observe(&mut self, position: usize);
    fn unobserve(&mut self, position: usize);
}

/// Latest visible fraction reported for one pane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub position: usize,
    pub ratio: f64,
}

impl IntersectionEntry {
    #[must_use]
    pub fn new(position: usize, ratio: f64) -> Self {
        Self { position, ratio }
    }
}

/// Pick the active pane from the latest visibility ratios.
///
/// Panes below `threshold` are ignored and the highest ratio wins. On an exact
/// tie `previous` keeps the focus if it is among the leaders, otherwise the
/// lowest position does. With no pane over the threshold `previous` stays.
#[must_use]
pub fn select_active(candidates: &[IntersectionEntry], previous: usize, threshold: f64) -> usize {
    let mut best: Option<IntersectionEntry> = None;
    for entry in candidates.iter().filter(|e| e.ratio >= threshold) {
        best = match best {
            None => Some(*entry),
            Some(current) if entry.ratio > current.ratio => Some(*entry),
            Some(current) if entry.ratio == current.ratio => {
                let keep_current = current.position == previous
                    || (entry.position != previous && current.position < entry.position);
                Some(if keep_current { current } else { *entry })
            }
            Some(current) => Some(current),
        };
    }
    best.map_or(previous, |entry| entry.position)
}

/// Tracks which positional pane of the feed is active.
///
/// Exactly one pane is active whenever any are attached; before the first
/// visibility report it is the lowest attached position.
pub struct ActivePaneTracker<O: PaneObserver> {
    observer: O,
    threshold: f64,
    observed: BTreeSet<usize>,
    ratios: BTreeMap<usize, f64>,
    active: Option<usize>,
}

impl<O: PaneObserver> ActivePaneTracker<O> {
    #[must_use]
    pub fn new(observer: O, threshold: f64) -> Self {
        Self {
            observer,
            threshold,
            observed: BTreeSet::new(),
            ratios: BTreeMap::new(),
            active: None,
        }
    }

    /// Register panes with the observer. Already attached positions are skipped.
    pub fn attach<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = usize>,
    {
        for position in positions {
            if self.observed.insert(position) {
                self.observer.observe(position);
            }
        }
        if self.active.is_none() {
            self.active = self.observed.first().copied();
        }
    }

    /// Unregister one pane, e.g. when it is recycled out of the feed.
    pub fn detach(&mut self, position: usize) {
        if self.observed.remove(&position) {
            self.observer.unobserve(position);
            self.ratios.remove(&position);
        }
        if self.active == Some(position) {
            self.active = self.observed.first().copied();
        }
    }

    /// Record a batch of visibility reports and return the new active position if it changed.
    pub fn on_intersections(&mut self, entries: &[IntersectionEntry]) -> Option<usize> {
        for entry in entries {
            if self.observed.contains(&entry.position) {
                self.ratios.insert(entry.position, entry.ratio);
            }
        }
        let previous = self.active?;
        let candidates: Vec<IntersectionEntry> = self
            .ratios
            .iter()
            .map(|(&position, &ratio)| IntersectionEntry { position, ratio })
            .collect();
        let next = select_active(&candidates, previous, self.threshold);
        if next == previous {
            return None;
        }
        debug!(from = previous, to = next, "active pane changed");
        self.active = Some(next);
        Some(next)
    }

    #[must_use]
    pub fn active(&self) -> Option<usize> {
        self.active
    }

    #[must_use]
    pub fn observed_len(&self) -> usize {
        self.observed.len()
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Unregister every pane. Safe to call more than once.
    pub fn teardown(&mut self) {
        for position in std::mem::take(&mut self.observed) {
            self.observer.unobserve(position);
        }
        self.ratios.clear();
        self.active = None;
    }
}

impl<O: PaneObserver> Drop for ActivePaneTracker<O> {
    fn drop(&mut self) {
        self.teardown();
    }
}
