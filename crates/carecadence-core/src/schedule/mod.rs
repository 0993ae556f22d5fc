//! Schedule definitions: the recurring reminder rules occurrences are
//! expanded from.
//!
//! Definitions are only ever created through the validating factory in
//! [`ScheduleDefinition::build`] and are retired, never deleted, so
//! adherence history keeps its denominator.

mod model;
mod store;

pub use model::{
    format_time_of_day, parse_time_of_day, FrequencyClass, NewSchedule, ScheduleDefinition,
    ScheduleKind,
};
pub use store::{ScheduleFilter, ScheduleStore};
