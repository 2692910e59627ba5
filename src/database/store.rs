//! # Migration Store
//!
//! The database collaborator of the chunk processor. The processor only sees
//! the [`MigrationStore`] trait: four commands, each returning the number of
//! rows it affected. [`MySqlMigrationStore`] is the production implementation.

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::time::{Duration, Instant};
use tracing::debug;

use super::queries::{ChunkUpdate, HistoryCopy, MigrationQueries};
use crate::config::{DatabaseConfig, MigrationConfig};
use crate::error::MigrationResult;

/// Commands issued by the pipeline. Each call is one database round trip and
/// runs as its own implicit transaction.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    /// Mark up to one chunk of source rows for `carrier`
    async fn update_source_chunk(&self, carrier: &str) -> MigrationResult<u64>;

    /// Copy every marked source row into the source history table
    async fn copy_source_to_history(&self) -> MigrationResult<u64>;

    /// Mark up to one chunk of secondary rows for `carrier`
    async fn update_secondary_chunk(&self, carrier: &str) -> MigrationResult<u64>;

    /// Copy every marked secondary row into the secondary history table
    async fn copy_secondary_to_history(&self) -> MigrationResult<u64>;
}

/// MySQL-backed store using a shared connection pool
#[derive(Clone)]
pub struct MySqlMigrationStore {
    pool: MySqlPool,
    queries: MigrationQueries,
}

// The pool is omitted from Debug output
impl std::fmt::Debug for MySqlMigrationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlMigrationStore")
            .field("queries", &self.queries)
            .finish_non_exhaustive()
    }
}

impl MySqlMigrationStore {
    pub fn new(pool: MySqlPool, config: &MigrationConfig) -> MigrationResult<Self> {
        let queries = MigrationQueries::from_config(config)?;
        Ok(Self { pool, queries })
    }

    /// Connect a pool from configuration and build the store
    pub async fn connect(config: &MigrationConfig) -> MigrationResult<Self> {
        let pool = Self::connect_pool(&config.database).await?;
        Self::new(pool, config)
    }

    pub async fn connect_pool(config: &DatabaseConfig) -> MigrationResult<MySqlPool> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;
        Ok(pool)
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn queries(&self) -> &MigrationQueries {
        &self.queries
    }

    async fn run_update(&self, statement: &ChunkUpdate, carrier: &str) -> MigrationResult<u64> {
        let start = Instant::now();
        let result = sqlx::query(&statement.sql)
            .bind(statement.set_status.as_str())
            .bind(statement.program_marker.as_str())
            .bind(carrier)
            .bind(statement.set_status.as_str())
            .bind(statement.correlated_status.as_str())
            .bind(carrier)
            .execute(&self.pool)
            .await?;

        debug!(
            carrier = %carrier,
            rows = result.rows_affected(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Executed chunk update"
        );
        Ok(result.rows_affected())
    }

    async fn run_copy(&self, statement: &HistoryCopy) -> MigrationResult<u64> {
        let start = Instant::now();
        let result = sqlx::query(&statement.sql)
            .bind(statement.program_marker.as_str())
            .execute(&self.pool)
            .await?;

        debug!(
            rows = result.rows_affected(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Executed history copy"
        );
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl MigrationStore for MySqlMigrationStore {
    async fn update_source_chunk(&self, carrier: &str) -> MigrationResult<u64> {
        self.run_update(&self.queries.update_source, carrier).await
    }

    async fn copy_source_to_history(&self) -> MigrationResult<u64> {
        self.run_copy(&self.queries.copy_source).await
    }

    async fn update_secondary_chunk(&self, carrier: &str) -> MigrationResult<u64> {
        self.run_update(&self.queries.update_secondary, carrier).await
    }

    async fn copy_secondary_to_history(&self) -> MigrationResult<u64> {
        self.run_copy(&self.queries.copy_secondary).await
    }
}
