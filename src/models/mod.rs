//! Data models for the course platform.
//!
//! Field names are camelCase on the wire and identifiers travel as `_id`,
//! matching the documents the frontend already consumes.

mod course;
mod discussion;
mod enrollment;
mod outcome;

pub use course::*;
pub use discussion::*;
pub use enrollment::*;
pub use outcome::*;

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::errors::AppError;

/// Current time as a fixed-width RFC 3339 string.
///
/// Fixed microsecond precision keeps lexical order equal to chronological
/// order, which the `ORDER BY` clauses rely on.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a client-supplied document identifier.
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Ok(Uuid::parse_str(raw.trim())?)
}

/// Return the trimmed value of a required text field.
pub fn require_field<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{} is required", name))),
    }
}
