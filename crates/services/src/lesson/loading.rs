use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use lesson_core::model::LessonId;

use crate::tasks::TaskGuard;

/// Pacing of the "preparing your lesson" screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingPlan {
    pub steps: usize,
    pub step_interval: Duration,
    pub tail: Duration,
}

impl Default for LoadingPlan {
    fn default() -> Self {
        Self {
            steps: 3,
            step_interval: Duration::from_millis(1500),
            tail: Duration::from_millis(500),
        }
    }
}

impl LoadingPlan {
    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    #[must_use]
    pub fn with_step_interval(mut self, interval: Duration) -> Self {
        self.step_interval = interval;
        self
    }

    #[must_use]
    pub fn with_tail(mut self, tail: Duration) -> Self {
        self.tail = tail;
        self
    }

    /// Time from start until `Ready`.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.step_interval
            .saturating_mul(u32::try_from(self.steps).unwrap_or(u32::MAX))
            .saturating_add(self.tail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadingEvent {
    /// The step shown now.
    Step(usize),
    Ready(LessonId),
}

/// Steps through the loading messages, then announces the lesson is ready.
///
/// The step stays on the last message once reached. Dropping the sequence
/// cancels both timers.
#[derive(Debug)]
pub struct LoadingSequence {
    step: Arc<AtomicUsize>,
    _stepper: TaskGuard,
    _ready: TaskGuard,
}

impl LoadingSequence {
    pub fn start(
        lesson_id: LessonId,
        plan: &LoadingPlan,
    ) -> (Self, mpsc::UnboundedReceiver<LoadingEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let step = Arc::new(AtomicUsize::new(0));

        let stepper = {
            let step = Arc::clone(&step);
            let events = events.clone();
            let interval = plan.step_interval;
            let last = plan.steps.saturating_sub(1);
            TaskGuard::spawn(async move {
                while step.load(Ordering::SeqCst) < last {
                    tokio::time::sleep(interval).await;
                    let current = step.fetch_add(1, Ordering::SeqCst) + 1;
                    if events.send(LoadingEvent::Step(current)).is_err() {
                        break;
                    }
                }
            })
        };

        let ready = {
            let total = plan.total();
            TaskGuard::spawn(async move {
                tokio::time::sleep(total).await;
                debug!(lesson = %lesson_id, "lesson ready");
                let _ = events.send(LoadingEvent::Ready(lesson_id));
            })
        };

        (
            Self {
                step,
                _stepper: stepper,
                _ready: ready,
            },
            receiver,
        )
    }

    #[must_use]
    pub fn step(&self) -> usize {
        self.step.load(Ordering::SeqCst)
    }
}
