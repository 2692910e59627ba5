//! # Migration Statements
//!
//! Renders the four MySQL statements of the pipeline once from validated
//! configuration. Identifiers are interpolated (they cannot be bound); every
//! value is a bind parameter.
//!
//! Update steps mark rows of one table whose group has reached the handoff
//! status in the *other* table:
//!
//! ```sql
//! UPDATE `table1` SET status = ?, programname = ?
//!  WHERE carrier = ? AND status != ?
//!    AND groupID IN (SELECT groupID FROM `table2` WHERE status = ? AND carrier = ?)
//!  LIMIT 1000
//! ```
//!
//! Copy steps move every marked row into the history table in one statement.

use crate::config::{MigrationConfig, TableConfig};
use crate::error::MigrationResult;
use crate::validation::validate_identifier;

/// A bounded `UPDATE … LIMIT` statement and its bind values.
///
/// Bind order: `set_status`, `program_marker`, carrier, `set_status` (guard),
/// `correlated_status`, carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkUpdate {
    pub sql: String,
    pub set_status: String,
    pub program_marker: String,
    pub correlated_status: String,
}

/// A one-shot `INSERT … SELECT` into a history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryCopy {
    pub sql: String,
    pub program_marker: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationQueries {
    pub update_source: ChunkUpdate,
    pub copy_source: HistoryCopy,
    pub update_secondary: ChunkUpdate,
    pub copy_secondary: HistoryCopy,
}

impl MigrationQueries {
    pub fn from_config(config: &MigrationConfig) -> MigrationResult<Self> {
        for name in [
            &config.source.table,
            &config.source.history_table,
            &config.secondary.table,
            &config.secondary.history_table,
        ] {
            validate_identifier(name)?;
        }
        for column in &config.copy_columns {
            validate_identifier(column)?;
        }

        let job = &config.job;
        Ok(Self {
            update_source: chunk_update(
                &config.source,
                &config.secondary,
                &job.in_progress_status,
                &job.program_marker,
                job.chunk_size,
            ),
            copy_source: history_copy(&config.source, &config.copy_columns, &job.program_marker),
            update_secondary: chunk_update(
                &config.secondary,
                &config.source,
                &job.in_progress_status,
                &job.program_marker,
                job.chunk_size,
            ),
            copy_secondary: history_copy(
                &config.secondary,
                &config.copy_columns,
                &job.program_marker,
            ),
        })
    }
}

fn chunk_update(
    target: &TableConfig,
    correlated: &TableConfig,
    in_progress_status: &str,
    program_marker: &str,
    chunk_size: u32,
) -> ChunkUpdate {
    let sql = format!(
        "UPDATE `{target}` SET status = ?, programname = ? \
         WHERE carrier = ? AND status != ? \
         AND groupID IN (SELECT groupID FROM `{correlated}` WHERE status = ? AND carrier = ?) \
         LIMIT {chunk_size}",
        target = target.table,
        correlated = correlated.table,
    );

    ChunkUpdate {
        sql,
        set_status: in_progress_status.to_string(),
        program_marker: program_marker.to_string(),
        correlated_status: correlated.handoff_status.clone(),
    }
}

fn history_copy(table: &TableConfig, columns: &[String], program_marker: &str) -> HistoryCopy {
    let column_list = columns
        .iter()
        .map(|c| format!("`{c}`"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO `{history}` ({column_list}) \
         SELECT {column_list} FROM `{table}` WHERE programname = ?",
        history = table.history_table,
        table = table.table,
    );

    HistoryCopy {
        sql,
        program_marker: program_marker.to_string(),
    }
}
