//! # System Constants
//!
//! Default values and event names that define the operational boundaries of a
//! carrier migration run.

/// Maximum number of rows a single update chunk may touch.
pub const DEFAULT_CHUNK_SIZE: u32 = 1000;

/// Default cadence of the periodic scheduler.
pub const DEFAULT_TICK_INTERVAL_SECONDS: u64 = 60;

/// Marker written into `programname` by the update steps and used to select
/// rows for the history copies.
pub const DEFAULT_PROGRAM_MARKER: &str = "sww";

/// Status written by the update steps. Rows already carrying it are skipped.
pub const DEFAULT_IN_PROGRESS_STATUS: &str = "I";

/// Status a source row must carry before secondary rows in its group migrate.
pub const DEFAULT_SOURCE_HANDOFF_STATUS: &str = "T";

/// Status a secondary row must carry before source rows in its group migrate.
pub const DEFAULT_SECONDARY_HANDOFF_STATUS: &str = "F";

/// Default capacity of the run event broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Columns copied into the history tables.
pub const DEFAULT_COPY_COLUMNS: [&str; 4] = ["groupID", "status", "programname", "carrier"];

/// Run lifecycle event names, used as the `event` field of structured logs.
pub mod events {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_COMPLETED: &str = "run.completed";
    pub const RUN_ABORTED: &str = "run.aborted";
    pub const CHUNK_MIGRATED: &str = "step.chunk_migrated";
    pub const STEP_COMPLETED: &str = "step.completed";
    pub const TICK_OVERRAN: &str = "tick.overran";
}

/// Environment variable names recognised by the crate.
pub mod env {
    pub const ENVIRONMENT: &str = "CARRIER_MIGRATION_ENV";
    pub const CONFIG_PATH: &str = "CARRIER_MIGRATION_CONFIG";
    pub const LOG_FORMAT: &str = "CARRIER_MIGRATION_LOG_FORMAT";
    pub const CONFIG_PREFIX: &str = "CARRIER_MIGRATION";
}
