//! # CareCadence Core Library
//!
//! This library provides the core business logic for CareCadence, a
//! medication and activity reminder engine. All operations are available
//! through the library API and a standalone CLI binary; any host (desktop,
//! mobile bridge, service) is a thin layer over the same engine.
//!
//! ## Architecture
//!
//! - **Schedules**: Validated recurring rules (what, when, how often)
//! - **Occurrences**: Lazily generated concrete instances with a
//!   Pending → Completed / Skipped / Missed state machine
//! - **Sweep**: Periodic overdue detection that marks missed occurrences and
//!   emits one notification per miss
//! - **Adherence**: Rates and buckets derived on demand from history
//!
//! ## Key Components
//!
//! - [`ReminderEngine`]: Single mutation entry point
//! - [`SweepTask`]: Background sweep loop on a Tokio runtime
//! - [`NotificationCenter`]: In-memory notification sink
//! - [`EngineConfig`]: TOML configuration
//! - [`Clock`]: Injectable time source

pub mod adherence;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod notify;
pub mod occurrence;
pub mod schedule;
pub mod sweep;

pub use adherence::{
    AdherenceBucket, AdherenceCalculator, AdherenceSnapshot, AdherenceThresholds, DateWindow,
    OverallAdherence, ScheduleAdherence,
};
pub use clock::{Clock, SimulatedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{DaySummary, OccurrenceEntry, ReminderEngine, SharedEngine};
pub use error::{ConfigError, CoreError, EntityKind, Result, ValidationError};
pub use notify::{
    NotificationCategory, NotificationCenter, NotificationEvent, NotificationPriority,
    NotificationSink, NullSink,
};
pub use occurrence::{Occurrence, OccurrenceLedger, OccurrenceStatus, Transition};
pub use schedule::{
    FrequencyClass, NewSchedule, ScheduleDefinition, ScheduleFilter, ScheduleKind, ScheduleStore,
};
pub use sweep::{SweepFailure, SweepReport, SweepTask};
