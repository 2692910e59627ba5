//! # Orchestration
//!
//! Drives a migration run from the control-plane request to the last history
//! copy.
//!
//! ## Core Components
//!
//! - **JobController**: accepts or rejects a start request for a carrier
//! - **ChunkProcessor**: executes one bounded pipeline step per tick
//! - **TickScheduler**: single-slot periodic timer that never overlaps ticks

pub mod chunk_processor;
pub mod controller;
pub mod scheduler;

pub use chunk_processor::{ChunkProcessor, TickOutcome};
pub use controller::{JobController, StartOutcome};
pub use scheduler::{TickSchedule, TickScheduler};
