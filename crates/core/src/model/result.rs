use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::LessonId;

/// Where a lesson session currently stands. Cheap to copy out for a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub visible_count: usize,
    pub total_items: usize,
    pub score: u32,
    pub total_scorable: u32,
}

impl ProgressSnapshot {
    /// Share of the lesson revealed so far, in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if self.total_items == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let fraction = self.visible_count as f32 / self.total_items as f32;
        fraction.min(1.0)
    }
}

/// Final outcome of a lesson, handed to the results view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonResult {
    pub lesson_id: LessonId,
    pub score: u32,
    pub total_scorable: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl LessonResult {
    /// Score as a percentage; a lesson without scorable items rates 0.
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.total_scorable == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let pct = self.score as f32 / self.total_scorable as f32 * 100.0;
        pct
    }

    /// Zero to three stars.
    #[must_use]
    pub fn stars(&self) -> u8 {
        let pct = self.percentage();
        if pct >= 80.0 {
            3
        } else if pct >= 50.0 {
            2
        } else if pct > 0.0 {
            1
        } else {
            0
        }
    }

    #[must_use]
    pub fn headline(&self) -> &'static str {
        match self.stars() {
            3 => "PERFECT!",
            1 | 2 => "GOOD JOB!",
            _ => "KEEP TRYING!",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn result(score: u32, total: u32) -> LessonResult {
        LessonResult {
            lesson_id: LessonId::new("lesson_2"),
            score,
            total_scorable: total,
            started_at: fixed_now(),
            completed_at: fixed_now(),
        }
    }

    #[test]
    fn stars_follow_percentage_bands() {
        assert_eq!(result(3, 3).stars(), 3);
        assert_eq!(result(4, 5).stars(), 3);
        assert_eq!(result(1, 2).stars(), 2);
        assert_eq!(result(1, 3).stars(), 1);
        assert_eq!(result(0, 3).stars(), 0);
        assert_eq!(result(0, 0).stars(), 0);
    }

    #[test]
    fn headline_matches_stars() {
        assert_eq!(result(3, 3).headline(), "PERFECT!");
        assert_eq!(result(1, 3).headline(), "GOOD JOB!");
        assert_eq!(result(0, 3).headline(), "KEEP TRYING!");
    }

    #[test]
    fn result_serializes_timestamps_as_rfc3339() {
        let value = serde_json::to_value(result(2, 3)).unwrap();
        assert_eq!(value["started_at"], "2023-11-14T22:13:20Z");
        assert_eq!(value["score"], 2);

        let back: LessonResult = serde_json::from_value(value).unwrap();
        assert_eq!(back.completed_at, fixed_now());
    }

    #[test]
    fn progress_fraction_is_clamped() {
        let snapshot = ProgressSnapshot {
            visible_count: 2,
            total_items: 4,
            score: 0,
            total_scorable: 2,
        };
        assert!((snapshot.fraction() - 0.5).abs() < f32::EPSILON);
        let empty = ProgressSnapshot {
            visible_count: 0,
            total_items: 0,
            score: 0,
            total_scorable: 0,
        };
        assert!(empty.fraction().abs() < f32::EPSILON);
    }
}
