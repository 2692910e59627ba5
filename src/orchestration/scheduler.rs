//! # Tick Scheduler
//!
//! Single-slot periodic scheduler. One tokio task sleeps until the next period
//! boundary and awaits the callback inline, so ticks never overlap. A boundary
//! that passes while a tick is still running is skipped rather than queued.
//!
//! ## Lifecycle
//!
//! - `arm()` spawns the timer task unless one is already armed
//! - `cancel()` stops future ticks; a tick already running finishes normally
//! - Cancelling twice, or with nothing armed, is a no-op

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::JobConfig;
use crate::error::SchedulerError;

type TickCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// When ticks fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    pub period: Duration,
    /// Fire on multiples of `period` since the Unix epoch (e.g. every full
    /// minute) instead of one period after arming
    pub align_to_period: bool,
}

impl TickSchedule {
    pub fn new(period: Duration, align_to_period: bool) -> Self {
        Self {
            period,
            align_to_period,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(config.tick_interval(), config.align_to_interval)
    }

    /// Delay from `now` until the first tick
    pub fn initial_delay(&self, now: DateTime<Utc>) -> Duration {
        if !self.align_to_period {
            return self.period;
        }

        let period_ms = self.period.as_millis().max(1);
        let now_ms = u128::try_from(now.timestamp_millis()).unwrap_or(0);
        let remaining_ms = period_ms - (now_ms % period_ms);
        Duration::from_millis(u64::try_from(remaining_ms).unwrap_or(u64::MAX))
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::from_config(&JobConfig::default())
    }
}

struct ArmedTask {
    task_id: Uuid,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ArmedTask {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

/// Periodic scheduler with a single execution slot
pub struct TickScheduler {
    schedule: TickSchedule,
    slot: Mutex<Option<ArmedTask>>,
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("schedule", &self.schedule)
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl TickScheduler {
    pub fn new(schedule: TickSchedule) -> Self {
        Self {
            schedule,
            slot: Mutex::new(None),
        }
    }

    pub fn schedule(&self) -> TickSchedule {
        self.schedule
    }

    /// Arm the scheduler to invoke `callback` on every tick.
    ///
    /// Returns `Ok(true)` when a new timer task was spawned and `Ok(false)`
    /// when one is already armed and not cancelled.
    pub fn arm<F, Fut>(&self, callback: F) -> Result<bool, SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();

        if let Some(task) = slot.as_ref().filter(|task| task.is_live()) {
            info!(task_id = %task.task_id, "Scheduled task is already running");
            return Ok(false);
        }

        if self.schedule.period.is_zero() {
            return Err(SchedulerError::InvalidInterval(self.schedule.period));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        let callback: TickCallback = Arc::new(move || -> BoxFuture<'static, ()> { Box::pin(callback()) });
        let token = CancellationToken::new();
        let task_id = Uuid::new_v4();
        let first_delay = self.schedule.initial_delay(Utc::now());

        let handle = runtime.spawn(run_ticks(
            task_id,
            self.schedule.period,
            first_delay,
            token.clone(),
            callback,
        ));

        info!(
            task_id = %task_id,
            period_seconds = self.schedule.period.as_secs_f64(),
            first_tick_in_ms = first_delay.as_millis() as u64,
            "Scheduled task started"
        );

        *slot = Some(ArmedTask {
            task_id,
            token,
            handle,
        });
        Ok(true)
    }

    /// Prevent future ticks. Returns whether an armed task was cancelled.
    pub fn cancel(&self) -> bool {
        let Some(task) = self.slot.lock().take() else {
            debug!("No scheduled task to cancel");
            return false;
        };

        let was_live = task.is_live();
        task.token.cancel();
        info!(task_id = %task.task_id, cancelled = was_live, "Scheduled task cancelled");
        was_live
    }

    pub fn is_armed(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(ArmedTask::is_live)
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.slot.get_mut().take() {
            task.token.cancel();
            debug!(task_id = %task.task_id, "Scheduler dropped. Scheduled task cancelled.");
        }
    }
}

async fn run_ticks(
    task_id: Uuid,
    period: Duration,
    first_delay: Duration,
    token: CancellationToken,
    callback: TickCallback,
) {
    let anchor = Instant::now() + first_delay;
    let mut next_tick = anchor;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = sleep_until(next_tick) => {}
        }

        debug!(task_id = %task_id, "Running scheduled tick");
        // Awaited outside the select: cancellation never interrupts a tick
        callback().await;

        if token.is_cancelled() {
            break;
        }

        // Boundaries that passed while the tick ran are skipped, not queued
        next_tick = next_boundary(anchor, period, Instant::now());
    }

    debug!(task_id = %task_id, "Scheduled task exited");
}

/// First boundary `anchor + k * period` strictly after `now`
fn next_boundary(anchor: Instant, period: Duration, now: Instant) -> Instant {
    if now < anchor {
        return anchor;
    }
    let elapsed_periods = (now - anchor).as_nanos() / period.as_nanos().max(1);
    let next_index = u32::try_from(elapsed_periods + 1).unwrap_or(u32::MAX);
    anchor + period.saturating_mul(next_index)
}
