//! Core error types for carecadence-core.
//!
//! This module defines the error hierarchy using thiserror. Validation
//! errors never leave partial state behind; transition errors are
//! recoverable and callers are expected to refresh and retry.

use std::path::PathBuf;
use thiserror::Error;

use crate::occurrence::OccurrenceStatus;

/// Core error type for carecadence-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed schedule definition
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Mutation attempted on an occurrence that is already terminal
    #[error("Invalid state transition for occurrence '{occurrence_id}': {from} -> {to}")]
    InvalidStateTransition {
        occurrence_id: String,
        from: OccurrenceStatus,
        to: OccurrenceStatus,
    },

    /// Missed transition requested before the occurrence is overdue
    #[error("Occurrence '{occurrence_id}' is not overdue until {due_at}")]
    NotYetDue {
        occurrence_id: String,
        due_at: chrono::NaiveDateTime,
    },

    /// Unknown schedule, occurrence or notification id
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Shared engine lock was poisoned by a panicking holder
    #[error("Engine lock poisoned")]
    LockPoisoned,
}

impl CoreError {
    pub(crate) fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Entity named by a [`CoreError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Schedule,
    Occurrence,
    Notification,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Schedule => write!(f, "Schedule"),
            EntityKind::Occurrence => write!(f, "Occurrence"),
            EntityKind::Notification => write!(f, "Notification"),
        }
    }
}

/// Validation errors raised while building a schedule definition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    /// No times of day were given
    #[error("Schedule must define at least one time of day")]
    NoTimesOfDay,

    /// Time of day is not HH:mm in 00:00-23:59
    #[error("Invalid time of day '{0}': expected HH:mm between 00:00 and 23:59")]
    InvalidTimeOfDay(String),

    /// End date precedes start date
    #[error("Invalid date range: end_date ({end}) is before start_date ({start})")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// Frequency class disagrees with the number of times of day
    #[error("Frequency '{frequency}' expects {expected} time(s) of day, got {actual}")]
    FrequencyMismatch {
        frequency: String,
        expected: usize,
        actual: usize,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not determine the configuration directory
    #[error("Failed to access configuration directory: {0}")]
    DirUnavailable(String),
}

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        CoreError::LockPoisoned
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
