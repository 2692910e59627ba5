//! Input validation for SQL identifiers
//!
//! Table and column names come from configuration and are interpolated into
//! statements, so they are restricted to plain identifiers.

use crate::error::{MigrationError, MigrationResult};

/// Maximum identifier length accepted by MySQL
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Validates that `name` is a plain SQL identifier: an ASCII letter or
/// underscore followed by ASCII alphanumerics or underscores.
pub fn validate_identifier(name: &str) -> MigrationResult<()> {
    if name.is_empty() {
        return Err(MigrationError::InvalidIdentifier(
            "identifier cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrationError::InvalidIdentifier(format!(
            "identifier too long: {} chars (max: {MAX_IDENTIFIER_LENGTH})",
            name.len()
        )));
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !first_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MigrationError::InvalidIdentifier(format!(
            "'{name}' is not a plain SQL identifier"
        )));
    }

    Ok(())
}
