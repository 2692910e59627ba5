//! # Chunk Processor
//!
//! Executes the migration pipeline one bounded unit of work per tick.
//!
//! ## Pipeline
//!
//! 1. `update_source`: mark up to one chunk of source rows; repeats every tick
//!    until a chunk touches zero rows
//! 2. `insert_source_history`: one bulk copy into the source history table
//! 3. `update_secondary`: chunked like step 1, correlated on the source status
//! 4. `insert_secondary_history`: one bulk copy, then the run stops
//!
//! Each tick issues at most one database command. When an update step reports
//! zero rows its flag is set and the tick ends; the next step waits for the
//! next tick. Any database fault aborts the whole run.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::scheduler::{TickSchedule, TickScheduler};
use crate::database::MigrationStore;
use crate::error::MigrationResult;
use crate::events::{AbortReason, RunEvent, RunEventPublisher};
use crate::logging::log_run_operation;
use crate::state_machine::{PipelineStep, RunSnapshot, RunState};

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No run active; nothing executed
    Idle,
    /// An update step touched rows and stays current
    ChunkMigrated { step: PipelineStep, rows: u64 },
    /// A non-terminal step finished and its flag is set
    StepCompleted { step: PipelineStep, rows: u64 },
    /// The terminal step finished and the run stopped
    RunCompleted { rows: u64 },
    /// The run was stopped without completing
    Aborted(AbortReason),
    /// The run ended while the step was in flight; its result was discarded
    Superseded { step: PipelineStep, rows: u64 },
    /// The run ended while the step was in flight and the step then failed;
    /// the fault was discarded and did not touch the replacing run
    SupersededFault { step: PipelineStep, error: String },
}

pub struct ChunkProcessor {
    state: Arc<RunState>,
    store: Arc<dyn MigrationStore>,
    scheduler: TickScheduler,
    events: RunEventPublisher,
}

impl std::fmt::Debug for ChunkProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkProcessor")
            .field("state", &self.state.snapshot())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl ChunkProcessor {
    pub fn new(
        state: Arc<RunState>,
        store: Arc<dyn MigrationStore>,
        schedule: TickSchedule,
        events: RunEventPublisher,
    ) -> Self {
        Self {
            state,
            store,
            scheduler: TickScheduler::new(schedule),
            events,
        }
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    pub fn events(&self) -> &RunEventPublisher {
        &self.events
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// Initialize the run for `carrier` and arm the scheduler.
    ///
    /// If the scheduler is already armed the run state is still initialized
    /// and arming is skipped. On arming failure the state is reset and the
    /// error returned.
    pub fn start(self: &Arc<Self>, carrier: &str) -> MigrationResult<()> {
        let run_id = Uuid::new_v4();
        self.state.reset_flags();
        self.state.set_carrier(carrier);
        self.state.set_run_id(run_id);
        self.state.set_active(true);

        let processor = Arc::downgrade(self);
        let armed = self.scheduler.arm(move || {
            let processor = processor.clone();
            async move {
                if let Some(processor) = processor.upgrade() {
                    processor.execute_tick().await;
                }
            }
        });

        if let Err(e) = armed {
            error!(run_id = %run_id, carrier = %carrier, error = %e, "Failed to arm scheduler");
            self.state.reset();
            return Err(e.into());
        }

        info!(run_id = %run_id, carrier = %carrier, "Migration run started");
        log_run_operation("start", Some(carrier), None, "accepted", None);
        self.events.publish(RunEvent::RunStarted {
            run_id,
            carrier: carrier.to_string(),
        });
        Ok(())
    }

    /// Cancel future ticks and reset the run state. Safe to call repeatedly.
    /// Returns whether an armed scheduler task was cancelled.
    pub fn stop(&self) -> bool {
        let cancelled = self.scheduler.cancel();
        self.state.reset();
        info!(scheduler_cancelled = cancelled, "Run state reset. Processing stopped.");
        cancelled
    }

    /// Stop an active run from outside the pipeline, e.g. on operator shutdown
    pub fn cancel_run(&self) -> bool {
        if !self.state.is_active() {
            self.stop();
            return false;
        }
        let snapshot = self.state.snapshot();
        self.abort(&snapshot, AbortReason::Cancelled);
        true
    }

    /// Perform one bounded unit of work for the current step
    pub async fn execute_tick(&self) -> TickOutcome {
        debug!("Chunk tick fired");

        if !self.state.is_active() {
            debug!("No run is active. Skipping tick.");
            return TickOutcome::Idle;
        }

        let snapshot = self.state.snapshot();
        let Some(carrier) = snapshot.carrier.clone() else {
            warn!(run_id = ?snapshot.run_id, "Carrier is not set. Stopping run.");
            self.abort(&snapshot, AbortReason::MissingCarrier);
            return TickOutcome::Aborted(AbortReason::MissingCarrier);
        };

        let started = Instant::now();
        let step = PipelineStep::from_flags(snapshot.step_flags);

        let outcome = match self.run_step(step, &carrier).await {
            Ok(rows) if self.state.run_id() != snapshot.run_id => {
                info!(
                    carrier = %carrier,
                    step = %step,
                    rows = rows,
                    "Run ended while step was in flight. Discarding result."
                );
                TickOutcome::Superseded { step, rows }
            }
            Ok(rows) => self.advance(step, &carrier, rows, &snapshot),
            Err(e) if self.state.run_id() != snapshot.run_id => {
                warn!(
                    run_id = ?snapshot.run_id,
                    carrier = %carrier,
                    step = %step,
                    error = %e,
                    "Run ended while step was in flight. Discarding fault."
                );
                TickOutcome::SupersededFault {
                    step,
                    error: e.to_string(),
                }
            }
            Err(e) => {
                error!(
                    run_id = ?snapshot.run_id,
                    carrier = %carrier,
                    step = %step,
                    error = %e,
                    "Error occurred during chunk processing. Aborting run."
                );
                let reason = AbortReason::StepFailed(e.to_string());
                self.abort(&snapshot, reason.clone());
                TickOutcome::Aborted(reason)
            }
        };

        self.observe_duration(started.elapsed());
        outcome
    }

    async fn run_step(&self, step: PipelineStep, carrier: &str) -> MigrationResult<u64> {
        match step {
            PipelineStep::UpdateSource => self.store.update_source_chunk(carrier).await,
            PipelineStep::InsertSourceHistory => self.store.copy_source_to_history().await,
            PipelineStep::UpdateSecondary => self.store.update_secondary_chunk(carrier).await,
            PipelineStep::InsertSecondaryHistory => self.store.copy_secondary_to_history().await,
        }
    }

    fn advance(
        &self,
        step: PipelineStep,
        carrier: &str,
        rows: u64,
        snapshot: &RunSnapshot,
    ) -> TickOutcome {
        if step.is_chunked() && rows > 0 {
            info!(carrier = %carrier, step = %step, rows = rows, "Processed chunk of records");
            self.events.publish(RunEvent::ChunkMigrated {
                carrier: carrier.to_string(),
                step,
                rows,
            });
            return TickOutcome::ChunkMigrated { step, rows };
        }

        if step.is_chunked() {
            info!(carrier = %carrier, step = %step, "No records left to process. Advancing.");
        } else {
            info!(carrier = %carrier, step = %step, rows = rows, "Copied records into history table");
        }

        self.events.publish(RunEvent::StepCompleted {
            carrier: carrier.to_string(),
            step,
            rows,
        });

        match step.completion_flag() {
            Some(flag) => {
                self.state.mark_step_completed(flag);
                TickOutcome::StepCompleted { step, rows }
            }
            None => {
                self.complete(carrier, snapshot);
                TickOutcome::RunCompleted { rows }
            }
        }
    }

    fn complete(&self, carrier: &str, snapshot: &RunSnapshot) {
        self.stop();
        info!(run_id = ?snapshot.run_id, carrier = %carrier, "Migration run completed");
        log_run_operation("complete", Some(carrier), None, "completed", None);
        self.events.publish(RunEvent::RunCompleted {
            run_id: snapshot.run_id,
            carrier: carrier.to_string(),
        });
    }

    fn abort(&self, snapshot: &RunSnapshot, reason: AbortReason) {
        self.stop();
        let step = snapshot.current_step();
        let details = format!("{reason:?}");
        log_run_operation(
            "abort",
            snapshot.carrier.as_deref(),
            step.map(|s| s.to_string()).as_deref(),
            "aborted",
            Some(&details),
        );
        self.events.publish(RunEvent::RunAborted {
            run_id: snapshot.run_id,
            carrier: snapshot.carrier.clone(),
            step,
            reason,
        });
    }

    fn observe_duration(&self, elapsed: Duration) {
        let period = self.scheduler.schedule().period;
        if elapsed > period {
            info!(
                duration_ms = elapsed.as_millis() as u64,
                period_ms = period.as_millis() as u64,
                "Chunk processing took longer than the tick interval. The next scheduled tick will be skipped."
            );
            self.events.publish(RunEvent::TickOverran {
                duration: elapsed,
                period,
            });
        } else {
            debug!(
                duration_ms = elapsed.as_millis() as u64,
                "Waiting for the next scheduled tick"
            );
        }
    }
}
