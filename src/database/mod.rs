//! # Database Layer
//!
//! Statement rendering and the store trait the pipeline executes against.

pub mod queries;
pub mod store;

pub use queries::{ChunkUpdate, HistoryCopy, MigrationQueries};
pub use store::{MigrationStore, MySqlMigrationStore};
