#![allow(clippy::doc_markdown)] // Allow technical terms like MySQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Carrier Migration
//!
//! Resumable, chunked migration of one carrier's rows across two related tables
//! and their history tables.
//!
//! ## Overview
//!
//! An operator starts a run for a carrier. A periodic scheduler then fires one
//! tick per interval, and every tick performs exactly one bounded database
//! command for the current pipeline step:
//!
//! 1. mark a chunk of source rows (repeats until nothing is left)
//! 2. copy the marked source rows into the source history table
//! 3. mark a chunk of secondary rows (repeats until nothing is left)
//! 4. copy the marked secondary rows into the secondary history table
//!
//! Progress is kept in memory as three monotonic completion flags. Any
//! database fault aborts the run; the operator restarts it.
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration (defaults, TOML file, environment)
//! - [`database`] - Statement rendering and the [`MigrationStore`] trait
//! - [`state_machine`] - Run state and pipeline positions
//! - [`orchestration`] - Controller, chunk processor and tick scheduler
//! - [`events`] - Run lifecycle events
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use carrier_migration::config::ConfigManager;
//! use carrier_migration::database::MySqlMigrationStore;
//! use carrier_migration::orchestration::JobController;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let store = MySqlMigrationStore::connect(manager.config()).await?;
//! let controller = JobController::from_config(manager.config(), Arc::new(store));
//!
//! let outcome = controller.start_run("CARR1");
//! println!("{} {}", outcome.status_code(), outcome.message());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod orchestration;
pub mod state_machine;
pub mod test_utils;
pub mod validation;

pub use config::{ConfigManager, ConfigurationError, MigrationConfig};
pub use database::{MigrationStore, MySqlMigrationStore};
pub use error::{MigrationError, MigrationResult, SchedulerError};
pub use events::{AbortReason, RunEvent, RunEventPublisher};
pub use orchestration::{ChunkProcessor, JobController, StartOutcome, TickOutcome};
pub use state_machine::{PipelineStep, RunSnapshot, RunState, StepFlag};
