//! Caller-supplied identifier validation and the versioned-table suffix.
//!
//! Checked before any network access; failures here are configuration
//! errors, not import errors.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;

use crate::error::{ImportError, Result};

static DATABASE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{32}$").expect("valid database id regex"));

static TABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]+$").expect("valid table name regex"));

/// PostgreSQL-safe budget for the public name.
const TABLE_NAME_MAX: usize = 31;
/// The version suffix consumes 14 characters of the budget.
const VERSION_SUFFIX_LEN: usize = 14;

/// Check that `database_id` is a 32-digit lowercase hex id.
pub fn validate_database_id(database_id: &str) -> Result<()> {
    if DATABASE_ID_RE.is_match(database_id) {
        Ok(())
    } else {
        Err(ImportError::Config(format!(
            "invalid Notion database ID: {database_id}; must match [0-9a-f]{{32}}"
        )))
    }
}

/// Check the destination table name shape and length budget.
///
/// Versioned runs reserve room for the `_yymmdd_hhmmss` suffix.
pub fn validate_table_name(table_name: &str, versioned: bool) -> Result<()> {
    if !TABLE_NAME_RE.is_match(table_name) {
        return Err(ImportError::Config(format!(
            "invalid PostgreSQL table name: {table_name}; must match [a-z_][a-z0-9_]+"
        )));
    }
    let max = if versioned {
        TABLE_NAME_MAX - VERSION_SUFFIX_LEN
    } else {
        TABLE_NAME_MAX
    };
    if table_name.len() > max {
        return Err(ImportError::Config(format!(
            "invalid PostgreSQL table name: {table_name}; \
             must contain no more than {max} characters"
        )));
    }
    Ok(())
}

/// Suffix appended to the physical table name of a versioned run.
pub fn version_suffix() -> String {
    Utc::now().format("_%y%m%d_%H%M%S").to_string()
}
