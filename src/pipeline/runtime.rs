// Pipeline runtime — routes events to both paths and drives the window timer.
//
// Each event is handed to the dispatcher on its own task and appended to the
// window buffer. On every tick the buffer is swapped out and handed to the
// aggregator on its own task; if the previous window is still processing the
// aggregator drops the new batch.
//
// At most `dispatch_limit` dispatch tasks run at once. While every slot is
// taken the loop stops receiving, so the bounded event channel fills and the
// reader blocks instead of the task set growing.
//
// When the event source closes, the timer stops and whatever is still in the
// buffer is discarded without a flush. Tasks already spawned are awaited.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::aggregator::{DuplicateAggregator, RunOutcome};
use super::dispatcher::{ClassificationDispatcher, DispatchOutcome};
use super::models::PostEvent;

/// Default cap on concurrently running dispatch tasks.
pub const MAX_IN_FLIGHT_DISPATCHES: usize = 64;

/// Totals for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events_received: u64,
    pub classified: u64,
    pub labeled_by_classifier: u64,
    pub windows_completed: u64,
    pub windows_dropped: u64,
    pub window_label_attempts: u64,
    pub escalations: u64,
    /// Buffered events thrown away when the source closed.
    pub discarded_on_shutdown: usize,
}

enum TaskDone {
    Dispatched(DispatchOutcome),
    Window(RunOutcome),
}

impl RunSummary {
    fn record(&mut self, done: TaskDone) {
        match done {
            TaskDone::Dispatched(DispatchOutcome::Classified { labeled, .. }) => {
                self.classified += 1;
                if labeled {
                    self.labeled_by_classifier += 1;
                }
            }
            TaskDone::Dispatched(_) => {}
            TaskDone::Window(RunOutcome::Completed(report)) => {
                self.windows_completed += 1;
                self.window_label_attempts += report.label_attempts as u64;
                self.escalations += report.escalated.len() as u64;
            }
            TaskDone::Window(RunOutcome::Dropped { .. }) => {
                self.windows_dropped += 1;
            }
        }
    }
}

pub struct Pipeline {
    dispatcher: Arc<ClassificationDispatcher>,
    aggregator: Arc<DuplicateAggregator>,
    window: Duration,
    dispatch_limit: usize,
}

impl Pipeline {
    pub fn new(
        dispatcher: Arc<ClassificationDispatcher>,
        aggregator: Arc<DuplicateAggregator>,
        window: Duration,
    ) -> Self {
        Self {
            dispatcher,
            aggregator,
            window,
            dispatch_limit: MAX_IN_FLIGHT_DISPATCHES,
        }
    }

    /// Override the in-flight dispatch cap (minimum 1).
    pub fn with_dispatch_limit(mut self, limit: usize) -> Self {
        self.dispatch_limit = limit.max(1);
        self
    }

    /// Consume events until the sender side closes.
    pub async fn run(&self, mut events: mpsc::Receiver<PostEvent>) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut tasks: JoinSet<TaskDone> = JoinSet::new();
        let mut buffer: Vec<PostEvent> = Vec::new();
        let slots = Arc::new(Semaphore::new(self.dispatch_limit));
        let mut slot: Option<OwnedSemaphorePermit> = None;

        let mut ticker = interval_at(Instant::now() + self.window, self.window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            window_secs = self.window.as_secs_f64(),
            dispatch_limit = self.dispatch_limit,
            "Pipeline started"
        );

        loop {
            tokio::select! {
                acquired = slots.clone().acquire_owned(), if slot.is_none() => {
                    // The semaphore is never closed
                    let Ok(permit) = acquired else {
                        break;
                    };
                    slot = Some(permit);
                }
                maybe_event = events.recv(), if slot.is_some() => {
                    let Some(event) = maybe_event else {
                        break;
                    };
                    summary.events_received += 1;

                    let dispatcher = self.dispatcher.clone();
                    let routed = event.clone();
                    let permit = slot.take();
                    tasks.spawn(async move {
                        let _permit = permit;
                        TaskDone::Dispatched(dispatcher.handle(&routed).await)
                    });
                    buffer.push(event);
                }
                _ = ticker.tick() => {
                    if buffer.is_empty() {
                        debug!("Window closed with no events");
                        continue;
                    }
                    let batch = std::mem::take(&mut buffer);
                    let aggregator = self.aggregator.clone();
                    tasks.spawn(async move {
                        TaskDone::Window(aggregator.run(batch).await)
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    match joined {
                        Ok(done) => summary.record(done),
                        Err(e) => error!(error = %e, "Pipeline task failed"),
                    }
                }
            }
        }

        drop(ticker);
        summary.discarded_on_shutdown = buffer.len();
        if !buffer.is_empty() {
            info!(
                events = buffer.len(),
                "Event source closed, discarding unflushed window"
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => summary.record(done),
                Err(e) => error!(error = %e, "Pipeline task failed"),
            }
        }

        info!(
            events = summary.events_received,
            classified = summary.classified,
            windows = summary.windows_completed,
            dropped_windows = summary.windows_dropped,
            escalations = summary.escalations,
            "Pipeline stopped"
        );

        summary
    }
}
