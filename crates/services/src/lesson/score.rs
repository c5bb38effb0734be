use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::info;

use lesson_core::model::LessonItemId;

/// Running score for one lesson session, fed by its scorable items.
#[derive(Debug, Default)]
pub struct ScoreTally {
    correct: AtomicU32,
    reports: AtomicU32,
}

impl ScoreTally {
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// One-shot reporter for the item `item`.
    #[must_use]
    pub fn reporter(self: &Arc<Self>, item: LessonItemId) -> ScoreReporter {
        ScoreReporter {
            item,
            tally: Arc::clone(self),
        }
    }

    /// Items answered correctly.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.correct.load(Ordering::SeqCst)
    }

    /// Items that have reported at all.
    #[must_use]
    pub fn reports(&self) -> u32 {
        self.reports.load(Ordering::SeqCst)
    }
}

/// Reports one item's outcome. Consumed by `report`, so an item can only report once.
#[derive(Debug)]
pub struct ScoreReporter {
    item: LessonItemId,
    tally: Arc<ScoreTally>,
}

impl ScoreReporter {
    pub fn report(self, correct: bool) {
        if correct {
            self.tally.correct.fetch_add(1, Ordering::SeqCst);
        }
        self.tally.reports.fetch_add(1, Ordering::SeqCst);
        info!(item = %self.item, correct, "item scored");
    }

    #[must_use]
    pub fn item(&self) -> &LessonItemId {
        &self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_accumulate_into_the_tally() {
        let tally = ScoreTally::shared();
        tally.reporter(LessonItemId::new("q1")).report(true);
        tally.reporter(LessonItemId::new("q2")).report(false);
        tally.reporter(LessonItemId::new("m1")).report(true);

        assert_eq!(tally.score(), 2);
        assert_eq!(tally.reports(), 3);
    }
}
