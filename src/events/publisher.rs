use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::constants::events as event_names;
use crate::state_machine::PipelineStep;

/// Why a run ended without completing the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AbortReason {
    /// Active run found with no carrier configured
    MissingCarrier,
    /// A step's database command failed
    StepFailed(String),
    /// Stopped from outside the pipeline (operator shutdown)
    Cancelled,
}

/// Lifecycle events of a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: Uuid,
        carrier: String,
    },
    /// An update step touched rows and will run again next tick
    ChunkMigrated {
        carrier: String,
        step: PipelineStep,
        rows: u64,
    },
    StepCompleted {
        carrier: String,
        step: PipelineStep,
        rows: u64,
    },
    RunCompleted {
        run_id: Option<Uuid>,
        carrier: String,
    },
    RunAborted {
        run_id: Option<Uuid>,
        carrier: Option<String>,
        step: Option<PipelineStep>,
        reason: AbortReason,
    },
    /// A tick took longer than the scheduling period
    TickOverran {
        duration: Duration,
        period: Duration,
    },
}

impl RunEvent {
    /// Event name used in structured logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => event_names::RUN_STARTED,
            Self::ChunkMigrated { .. } => event_names::CHUNK_MIGRATED,
            Self::StepCompleted { .. } => event_names::STEP_COMPLETED,
            Self::RunCompleted { .. } => event_names::RUN_COMPLETED,
            Self::RunAborted { .. } => event_names::RUN_ABORTED,
            Self::TickOverran { .. } => event_names::TICK_OVERRAN,
        }
    }

    /// True for the two events that end a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunCompleted { .. } | Self::RunAborted { .. })
    }
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: RunEvent,
    pub published_at: DateTime<Utc>,
}

/// Broadcast publisher for run lifecycle events
#[derive(Debug, Clone)]
pub struct RunEventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

impl RunEventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: RunEvent) {
        let published = PublishedEvent {
            event,
            published_at: Utc::now(),
        };
        let _ = self.sender.send(published);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RunEventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}
