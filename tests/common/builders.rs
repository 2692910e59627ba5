#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use carrier_migration::events::{PublishedEvent, RunEvent, RunEventPublisher};
use carrier_migration::orchestration::{ChunkProcessor, JobController, TickSchedule};
use carrier_migration::state_machine::RunState;
use carrier_migration::test_utils::ScriptedMigrationStore;
use tokio::sync::broadcast;

/// Period long enough that scheduled ticks never interfere with hand-driven ones
pub const MANUAL_PERIOD: Duration = Duration::from_secs(3600);

pub struct TestHarness {
    pub store: Arc<ScriptedMigrationStore>,
    pub controller: JobController,
}

impl TestHarness {
    /// Controller whose ticks are driven by the test via `tick()`
    pub fn manual() -> Self {
        Self::with_period(MANUAL_PERIOD)
    }

    /// Controller ticking every `period`, starting one period after arming
    pub fn with_period(period: Duration) -> Self {
        let store = ScriptedMigrationStore::shared();
        let processor = ChunkProcessor::new(
            Arc::new(RunState::new()),
            store.clone(),
            TickSchedule::new(period, false),
            RunEventPublisher::new(64),
        );
        let controller = JobController::new(Arc::new(processor));
        Self { store, controller }
    }

    pub async fn tick(&self) -> carrier_migration::orchestration::TickOutcome {
        self.controller.processor().execute_tick().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.controller.subscribe()
    }
}

/// Collect every event currently buffered in `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<PublishedEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(published) = rx.try_recv() {
        events.push(published.event);
    }
    events
}
