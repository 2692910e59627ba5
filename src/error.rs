//! Error types for the carrier migration system.

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Scheduler error: {0}")]
    SchedulerError(String),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl From<sqlx::Error> for MigrationError {
    fn from(err: sqlx::Error) -> Self {
        MigrationError::DatabaseError(err.to_string())
    }
}

impl From<ConfigurationError> for MigrationError {
    fn from(err: ConfigurationError) -> Self {
        MigrationError::ConfigurationError(err.to_string())
    }
}

impl From<SchedulerError> for MigrationError {
    fn from(err: SchedulerError) -> Self {
        MigrationError::SchedulerError(err.to_string())
    }
}

/// Errors raised while arming the periodic scheduler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("no async runtime available to arm the scheduler: {0}")]
    NoRuntime(String),
    #[error("invalid tick interval: {0:?}")]
    InvalidInterval(std::time::Duration),
}

pub type MigrationResult<T> = std::result::Result<T, MigrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::DatabaseError("connection refused".to_string());
        assert_eq!(err.to_string(), "Database error: connection refused");

        let err: MigrationError = SchedulerError::NoRuntime("outside runtime".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Scheduler error: no async runtime available to arm the scheduler: outside runtime"
        );
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: MigrationError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, MigrationError::DatabaseError(_)));
    }
}
