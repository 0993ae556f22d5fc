//! Occurrences: concrete expected instances of a schedule at one date-time.
//!
//! ```text
//!            +--> Completed
//!            |
//! Pending ---+--> Skipped
//!            |
//!            +--> Missed   (sweep only, once overdue)
//! ```
//!
//! Terminal states never transition again. The [`OccurrenceLedger`] is the
//! single mutation entry point and keeps the pending index consistent.

mod generator;
mod ledger;
mod model;
mod state;

pub use generator::{expand, generate_for_date, GenerationOutcome};
pub use ledger::OccurrenceLedger;
pub use model::{Occurrence, OccurrenceStatus};
pub use state::Transition;
