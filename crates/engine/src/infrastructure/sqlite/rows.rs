//! Column encoding shared by the SQLite repositories.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::infrastructure::ports::RepoError;

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub(super) fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(super) fn parse_ts(value: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::serialization(format!("bad timestamp '{}': {}", value, e)))
}

pub(super) fn parse_uuid(value: &str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(value).map_err(|e| RepoError::serialization(format!("bad id '{}': {}", value, e)))
}

pub(super) fn to_json<T: Serialize>(value: &T) -> Result<String, RepoError> {
    serde_json::to_string(value).map_err(RepoError::serialization)
}

pub(super) fn from_json<T: DeserializeOwned>(value: &str) -> Result<T, RepoError> {
    serde_json::from_str(value).map_err(RepoError::serialization)
}

pub(super) fn col<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepoError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepoError::serialization(format!("column {}: {}", name, e)))
}

/// Map a write failure, surfacing unique/foreign-key violations as constraints.
pub(super) fn write_err(operation: &'static str, e: sqlx::Error) -> RepoError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() || db.is_foreign_key_violation() {
            return RepoError::constraint(format!("{}: {}", operation, db.message()));
        }
    }
    RepoError::database(operation, e)
}
