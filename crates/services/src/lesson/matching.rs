use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::seq::SliceRandom;
use tracing::{debug, warn};

use lesson_core::model::{LessonItemId, MatchPair, MatchingContent, PairId};

use crate::lesson::score::ScoreReporter;
use crate::narration::{NarrationService, PlayOutcome};
use crate::tasks::{TaskGuard, lock};

/// How long a mismatched pair stays highlighted before both tiles clear.
pub const DEFAULT_MISMATCH_CLEAR: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Left,
    Right,
}

/// Result of tapping a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Tile is matched already or unknown.
    Ignored,
    /// Waiting for a tile in the other column.
    Selected,
    Matched,
    /// Both tiles stay highlighted until the clear delay passes.
    Mismatched,
    /// Last pair matched; the item has reported success.
    Completed,
}

#[derive(Debug, Default)]
struct MatchState {
    left: Option<PairId>,
    right: Option<PairId>,
    matched: HashSet<PairId>,
    mismatched: bool,
    generation: u64,
    reporter: Option<ScoreReporter>,
}

impl MatchState {
    fn clear_selection(&mut self) {
        self.left = None;
        self.right = None;
        self.mismatched = false;
    }
}

/// A word-matching board: left column in lesson order, right column shuffled.
#[derive(Debug)]
pub struct MatchingItem {
    id: LessonItemId,
    pairs: Vec<MatchPair>,
    right_order: Vec<PairId>,
    state: Arc<Mutex<MatchState>>,
    clear_delay: Duration,
    pending_clear: Option<TaskGuard>,
}

impl MatchingItem {
    #[must_use]
    pub fn new(id: LessonItemId, content: MatchingContent, reporter: ScoreReporter) -> Self {
        let mut right_order: Vec<PairId> = content.pairs.iter().map(|p| p.id.clone()).collect();
        right_order.shuffle(&mut rand::rng());
        Self {
            id,
            pairs: content.pairs,
            right_order,
            state: Arc::new(Mutex::new(MatchState {
                reporter: Some(reporter),
                ..MatchState::default()
            })),
            clear_delay: DEFAULT_MISMATCH_CLEAR,
            pending_clear: None,
        }
    }

    #[must_use]
    pub fn with_clear_delay(mut self, delay: Duration) -> Self {
        self.clear_delay = delay;
        self
    }

    #[must_use]
    pub fn id(&self) -> &LessonItemId {
        &self.id
    }

    /// Left tiles in lesson order.
    pub fn left_column(&self) -> impl Iterator<Item = (&PairId, &str)> {
        self.pairs.iter().map(|p| (&p.id, p.left.as_str()))
    }

    /// Right tiles in their shuffled display order.
    pub fn right_column(&self) -> impl Iterator<Item = (&PairId, &str)> {
        self.right_order
            .iter()
            .filter_map(|id| self.pair(id).map(|p| (&p.id, p.right.as_str())))
    }

    pub fn select_left(&mut self, pair: &PairId) -> SelectOutcome {
        self.select(Column::Left, pair)
    }

    pub fn select_right(&mut self, pair: &PairId) -> SelectOutcome {
        self.select(Column::Right, pair)
    }

    /// Tap a tile. A tap during the mismatch window cancels the pending clear
    /// and is evaluated against whatever is still selected.
    pub fn select(&mut self, column: Column, pair: &PairId) -> SelectOutcome {
        if self.pair(pair).is_none() {
            return SelectOutcome::Ignored;
        }
        let mut st = lock(&self.state);
        if st.matched.contains(pair) {
            return SelectOutcome::Ignored;
        }

        if st.mismatched {
            st.mismatched = false;
            st.generation += 1;
            self.pending_clear = None;
        }
        match column {
            Column::Left => st.left = Some(pair.clone()),
            Column::Right => st.right = Some(pair.clone()),
        }

        let (Some(left), Some(right)) = (st.left.clone(), st.right.clone()) else {
            return SelectOutcome::Selected;
        };
        if left != right {
            st.mismatched = true;
            st.generation += 1;
            let generation = st.generation;
            drop(st);
            debug!(item = %self.id, %left, %right, "mismatch");
            self.schedule_clear(generation);
            return SelectOutcome::Mismatched;
        }

        st.matched.insert(left);
        st.clear_selection();
        if st.matched.len() < self.pairs.len() {
            return SelectOutcome::Matched;
        }
        if let Some(reporter) = st.reporter.take() {
            reporter.report(true);
        }
        SelectOutcome::Completed
    }

    #[must_use]
    pub fn selection(&self) -> (Option<PairId>, Option<PairId>) {
        let st = lock(&self.state);
        (st.left.clone(), st.right.clone())
    }

    #[must_use]
    pub fn is_matched(&self, pair: &PairId) -> bool {
        lock(&self.state).matched.contains(pair)
    }

    #[must_use]
    pub fn is_mismatched(&self) -> bool {
        lock(&self.state).mismatched
    }

    #[must_use]
    pub fn matched_len(&self) -> usize {
        lock(&self.state).matched.len()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.matched_len() == self.pairs.len()
    }

    /// Speak the left (target-language) word of a pair.
    pub fn pronounce(
        &self,
        narration: &NarrationService,
        pair: &PairId,
    ) -> Option<impl Future<Output = PlayOutcome> + Send + use<>> {
        let text = self.pair(pair)?.left.clone();
        let narration = narration.clone();
        Some(async move {
            narration
                .play(&text, || {}, |err| warn!(%err, "word narration failed"))
                .await
        })
    }

    /// Cancel a pending clear. Also happens on drop.
    pub fn teardown(&mut self) {
        self.pending_clear = None;
    }

    fn pair(&self, id: &PairId) -> Option<&MatchPair> {
        self.pairs.iter().find(|p| &p.id == id)
    }

    fn schedule_clear(&mut self, generation: u64) {
        let state = Arc::clone(&self.state);
        let delay = self.clear_delay;
        self.pending_clear = Some(TaskGuard::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut st = lock(&state);
            if st.generation == generation {
                st.clear_selection();
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::score::ScoreTally;

    fn pairs(n: usize) -> MatchingContent {
        MatchingContent {
            pairs: (1..=n)
                .map(|i| MatchPair {
                    id: PairId::new(format!("p{i}")),
                    left: format!("word{i}"),
                    right: format!("meaning{i}"),
                })
                .collect(),
        }
    }

    fn board(tally: &Arc<ScoreTally>, n: usize) -> MatchingItem {
        let id = LessonItemId::new("m1");
        MatchingItem::new(id.clone(), pairs(n), tally.reporter(id))
    }

    fn p(id: &str) -> PairId {
        PairId::new(id)
    }

    #[test]
    fn right_column_is_a_permutation_and_left_keeps_order() {
        let tally = ScoreTally::shared();
        let item = board(&tally, 6);

        let left: Vec<&str> = item.left_column().map(|(_, w)| w).collect();
        assert_eq!(left, ["word1", "word2", "word3", "word4", "word5", "word6"]);

        let shown: Vec<(PairId, String)> = item
            .right_column()
            .map(|(id, w)| (id.clone(), w.to_owned()))
            .collect();
        for (id, word) in &shown {
            assert_eq!(word, &format!("meaning{}", &id.as_str()[1..]));
        }

        let mut sorted: Vec<&str> = shown.iter().map(|(_, w)| w.as_str()).collect();
        sorted.sort_unstable();
        let canonical: Vec<String> = pairs(6).pairs.into_iter().map(|p| p.right).collect();
        assert_eq!(sorted, canonical);

        for _ in 0..3 {
            let again: Vec<(PairId, String)> = item
                .right_column()
                .map(|(id, w)| (id.clone(), w.to_owned()))
                .collect();
            assert_eq!(again, shown);
        }
    }

    #[tokio::test]
    async fn completing_the_board_reports_once() {
        let tally = ScoreTally::shared();
        let mut item = board(&tally, 4);

        for i in 1..=3 {
            let id = p(&format!("p{i}"));
            assert_eq!(item.select_left(&id), SelectOutcome::Selected);
            assert_eq!(item.select_right(&id), SelectOutcome::Matched);
        }
        item.select_right(&p("p4"));
        assert_eq!(item.select_left(&p("p4")), SelectOutcome::Completed);

        assert!(item.is_complete());
        assert_eq!(item.select_left(&p("p4")), SelectOutcome::Ignored);
        assert_eq!(tally.score(), 1);
        assert_eq!(tally.reports(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mismatch_clears_after_the_delay() {
        let tally = ScoreTally::shared();
        let mut item = board(&tally, 3);

        item.select_left(&p("p1"));
        assert_eq!(item.select_right(&p("p2")), SelectOutcome::Mismatched);
        assert!(item.is_mismatched());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(item.selection(), (Some(p("p1")), Some(p("p2"))));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(item.selection(), (None, None));
        assert!(!item.is_mismatched());
        assert_eq!(tally.reports(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn new_selection_in_mismatch_window_cancels_the_clear() {
        let tally = ScoreTally::shared();
        let mut item = board(&tally, 3);

        item.select_left(&p("p1"));
        item.select_right(&p("p2"));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(item.select_right(&p("p1")), SelectOutcome::Matched);

        item.select_left(&p("p3"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(item.selection(), (Some(p("p3")), None));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_clear() {
        let tally = ScoreTally::shared();
        let mut item = board(&tally, 2);

        item.select_left(&p("p1"));
        item.select_right(&p("p2"));
        item.teardown();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(item.is_mismatched());
    }

    #[test]
    fn unknown_tiles_are_ignored() {
        let tally = ScoreTally::shared();
        let mut item = board(&tally, 2);
        assert_eq!(item.select_left(&p("nope")), SelectOutcome::Ignored);
    }

    #[tokio::test]
    async fn pronounces_the_left_word_of_a_pair() {
        use crate::test_support::{FakeOutput, FakeSynthesizer};

        let output = Arc::new(FakeOutput::new());
        let narration = NarrationService::new(Arc::new(FakeSynthesizer::new()), output.clone());
        let tally = ScoreTally::shared();
        let item = board(&tally, 2);

        assert!(item.pronounce(&narration, &p("nope")).is_none());
        let outcome = item.pronounce(&narration, &p("p2")).unwrap().await;
        assert!(matches!(outcome, PlayOutcome::Started(_)));
        assert_eq!(output.started(), vec!["word2".to_string()]);
    }
}
