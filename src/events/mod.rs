//! # Run Events
//!
//! Lifecycle notifications for a migration run. Successful completion and abort
//! both leave the run state idle; the events are what tells them apart.

pub mod publisher;

pub use publisher::{AbortReason, PublishedEvent, RunEvent, RunEventPublisher};
