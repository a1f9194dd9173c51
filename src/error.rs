//! Structured error types for planner operations.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidStatus,
    InvalidWeekday,
    InvalidWeekKey,
    InvalidDate,

    // Authorization errors
    Forbidden,

    // Not found errors
    TaskNotFound,
    TemplateNotFound,
    PlacementNotFound,
    EntryNotFound,

    // Conflict errors
    TimerAlreadyRunning,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Taxonomy class of an [`ErrorCode`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorCode {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::InvalidStatus
            | ErrorCode::InvalidWeekday
            | ErrorCode::InvalidWeekKey
            | ErrorCode::InvalidDate => ErrorKind::Validation,
            ErrorCode::Forbidden => ErrorKind::Authorization,
            ErrorCode::TaskNotFound
            | ErrorCode::TemplateNotFound
            | ErrorCode::PlacementNotFound
            | ErrorCode::EntryNotFound => ErrorKind::NotFound,
            ErrorCode::TimerAlreadyRunning => ErrorKind::Conflict,
            ErrorCode::DatabaseError | ErrorCode::InternalError => ErrorKind::Internal,
        }
    }
}

/// Structured error returned by every planner operation.
#[derive(Debug, Error, Serialize)]
#[error("{message}")]
pub struct PlannerError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl PlannerError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_status(value: &str) -> Self {
        Self::new(
            ErrorCode::InvalidStatus,
            format!(
                "Unknown status '{}'. Valid statuses: backlog, todo, in_progress, done",
                value
            ),
        )
        .with_field("status")
    }

    pub fn invalid_weekday(weekday: i64) -> Self {
        Self::new(
            ErrorCode::InvalidWeekday,
            format!("Weekday must be between 1 (Monday) and 5 (Friday), got {}", weekday),
        )
        .with_field("weekday")
    }

    pub fn invalid_week_key(value: &str) -> Self {
        Self::new(
            ErrorCode::InvalidWeekKey,
            format!("Malformed week key '{}', expected YYYY-Www", value),
        )
        .with_field("week_key")
    }

    pub fn invalid_date(value: &str) -> Self {
        Self::new(
            ErrorCode::InvalidDate,
            format!("Malformed date '{}', expected YYYY-MM-DD", value),
        )
        .with_field("date")
    }

    pub fn forbidden(entity: &str, id: &str) -> Self {
        Self::new(
            ErrorCode::Forbidden,
            format!("{} {} belongs to another owner", entity, id),
        )
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn template_not_found(template_id: &str) -> Self {
        Self::new(
            ErrorCode::TemplateNotFound,
            format!("Recurring template not found: {}", template_id),
        )
    }

    pub fn placement_not_found(placement_id: &str) -> Self {
        Self::new(
            ErrorCode::PlacementNotFound,
            format!("Placement not found: {}", placement_id),
        )
    }

    pub fn entry_not_found(entry_id: &str) -> Self {
        Self::new(
            ErrorCode::EntryNotFound,
            format!("Time entry not found: {}", entry_id),
        )
    }

    pub fn timer_already_running(owner_id: &str) -> Self {
        Self::new(
            ErrorCode::TimerAlreadyRunning,
            format!("{} already has a running timer", owner_id),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl From<rusqlite::Error> for PlannerError {
    fn from(err: rusqlite::Error) -> Self {
        // The only unique index a planner write can trip is the running-timer one.
        if let rusqlite::Error::SqliteFailure(ref failure, Some(ref msg)) = err
            && failure.code == rusqlite::ErrorCode::ConstraintViolation
            && msg.contains("timer_entries.owner_id")
        {
            return Self::new(ErrorCode::TimerAlreadyRunning, msg.clone());
        }
        PlannerError::database(err)
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::internal(err)
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for PlannerError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<PlannerError>() {
            Ok(planner_err) => planner_err,
            Err(err) => PlannerError::internal(err),
        }
    }
}

/// Result type for planner operations.
pub type PlannerResult<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_taxonomy() {
        assert_eq!(ErrorCode::InvalidStatus.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::InvalidWeekKey.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::Forbidden.kind(), ErrorKind::Authorization);
        assert_eq!(ErrorCode::TaskNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::EntryNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::TimerAlreadyRunning.kind(), ErrorKind::Conflict);
        assert_eq!(ErrorCode::DatabaseError.kind(), ErrorKind::Internal);
    }

    #[test]
    fn anyhow_roundtrip_keeps_code() {
        let err: anyhow::Error = PlannerError::task_not_found("abc").into();
        let back = PlannerError::from(err);
        assert_eq!(back.code, ErrorCode::TaskNotFound);
    }

    #[test]
    fn serializes_with_screaming_code() {
        let err = PlannerError::invalid_weekday(6);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "INVALID_WEEKDAY");
        assert_eq!(value["field"], "weekday");
    }
}
