//! # Job Controller
//!
//! Control-plane entry point. Accepts a start request for a carrier, rejects it
//! while a run is active, and otherwise initializes the run state and hands the
//! run to the [`ChunkProcessor`].

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use super::chunk_processor::ChunkProcessor;
use super::scheduler::TickSchedule;
use crate::config::MigrationConfig;
use crate::database::MigrationStore;
use crate::events::{PublishedEvent, RunEventPublisher};
use crate::logging::log_run_operation;
use crate::state_machine::{RunSnapshot, RunState};

/// Result of a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Accepted,
    /// A run is already active; state was not touched
    Conflict,
    InternalError(String),
}

impl StartOutcome {
    /// HTTP status code the outcome corresponds to
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Accepted => 200,
            Self::Conflict => 409,
            Self::InternalError(_) => 500,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Accepted => "Job started successfully".to_string(),
            Self::Conflict => "Job is already running.".to_string(),
            Self::InternalError(msg) => format!("Job failed to start: {msg}"),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Debug)]
pub struct JobController {
    state: Arc<RunState>,
    processor: Arc<ChunkProcessor>,
    start_lock: Mutex<()>,
}

impl JobController {
    pub fn new(processor: Arc<ChunkProcessor>) -> Self {
        Self {
            state: Arc::clone(processor.state()),
            processor,
            start_lock: Mutex::new(()),
        }
    }

    /// Wire a controller, processor and fresh run state from configuration
    pub fn from_config(config: &MigrationConfig, store: Arc<dyn MigrationStore>) -> Self {
        let processor = ChunkProcessor::new(
            Arc::new(RunState::new()),
            store,
            TickSchedule::from_config(&config.job),
            RunEventPublisher::new(config.job.event_channel_capacity),
        );
        Self::new(Arc::new(processor))
    }

    /// Start a migration run for `carrier`
    pub fn start_run(&self, carrier: &str) -> StartOutcome {
        let _guard = self.start_lock.lock();

        if self.state.is_active() {
            warn!(carrier = %carrier, current = ?self.state.carrier(), "Job is already running");
            log_run_operation("start", Some(carrier), None, "conflict", None);
            return StartOutcome::Conflict;
        }

        self.state.reset();
        self.state.set_carrier(carrier);

        match self.processor.start(carrier) {
            Ok(()) => {
                info!(carrier = %carrier, "Job started successfully");
                StartOutcome::Accepted
            }
            Err(e) => {
                error!(carrier = %carrier, error = %e, "Job failed to start");
                log_run_operation("start", Some(carrier), None, "failed", Some(&e.to_string()));
                StartOutcome::InternalError(e.to_string())
            }
        }
    }

    pub fn status(&self) -> RunSnapshot {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.processor.events().subscribe()
    }

    /// Abort the active run, if any. Returns whether a run was active.
    pub fn shutdown(&self) -> bool {
        let _guard = self.start_lock.lock();
        self.processor.cancel_run()
    }

    pub fn processor(&self) -> &Arc<ChunkProcessor> {
        &self.processor
    }
}
