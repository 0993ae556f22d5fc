//! Schedule definition types and their validating factory.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What a schedule reminds the owner to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Medication,
    Activity,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Medication => write!(f, "medication"),
            ScheduleKind::Activity => write!(f, "activity"),
        }
    }
}

/// How often a schedule fires per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyClass {
    #[default]
    Daily,
    TwiceDaily,
    ThreeTimesDaily,
    FourTimesDaily,
    /// Any non-empty set of times.
    Custom,
}

impl FrequencyClass {
    /// Number of times of day this class requires, if fixed.
    pub fn expected_times(&self) -> Option<usize> {
        match self {
            FrequencyClass::Daily => Some(1),
            FrequencyClass::TwiceDaily => Some(2),
            FrequencyClass::ThreeTimesDaily => Some(3),
            FrequencyClass::FourTimesDaily => Some(4),
            FrequencyClass::Custom => None,
        }
    }
}

impl fmt::Display for FrequencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrequencyClass::Daily => write!(f, "daily"),
            FrequencyClass::TwiceDaily => write!(f, "twice_daily"),
            FrequencyClass::ThreeTimesDaily => write!(f, "three_times_daily"),
            FrequencyClass::FourTimesDaily => write!(f, "four_times_daily"),
            FrequencyClass::Custom => write!(f, "custom"),
        }
    }
}

/// Parse a strict `HH:mm` string (two digits each, 00:00 through 23:59).
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, ValidationError> {
    let invalid = || ValidationError::InvalidTimeOfDay(raw.to_string());
    let bytes = raw.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(invalid());
    }
    let digits = |s: &str| -> Option<u32> {
        if s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().ok()
        } else {
            None
        }
    };
    let hour = digits(&raw[0..2]).ok_or_else(invalid)?;
    let minute = digits(&raw[3..5]).ok_or_else(invalid)?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Format a time of day back to `HH:mm`.
pub fn format_time_of_day(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

/// Caller-supplied fields for a new schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    pub owner_id: String,
    pub kind: ScheduleKind,
    pub name: String,
    #[serde(default)]
    pub dosage_or_description: String,
    #[serde(default)]
    pub frequency: FrequencyClass,
    pub times_of_day: Vec<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl NewSchedule {
    pub fn new(
        owner_id: impl Into<String>,
        kind: ScheduleKind,
        name: impl Into<String>,
        times_of_day: &[&str],
        start_date: NaiveDate,
    ) -> Self {
        let times_of_day: Vec<String> = times_of_day.iter().map(|t| t.to_string()).collect();
        let frequency = match times_of_day.len() {
            1 => FrequencyClass::Daily,
            2 => FrequencyClass::TwiceDaily,
            3 => FrequencyClass::ThreeTimesDaily,
            4 => FrequencyClass::FourTimesDaily,
            _ => FrequencyClass::Custom,
        };
        Self {
            owner_id: owner_id.into(),
            kind,
            name: name.into(),
            dosage_or_description: String::new(),
            frequency,
            times_of_day,
            start_date,
            end_date: None,
        }
    }

    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.dosage_or_description = text.into();
        self
    }

    pub fn with_frequency(mut self, frequency: FrequencyClass) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

/// A validated recurring reminder rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDefinition {
    pub id: String,
    pub owner_id: String,
    pub kind: ScheduleKind,
    pub name: String,
    pub dosage_or_description: String,
    pub frequency: FrequencyClass,
    /// Sorted, de-duplicated, never empty.
    pub times_of_day: Vec<NaiveTime>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ScheduleDefinition {
    /// Validate `new` and build a definition. Nothing is constructed on error.
    pub fn build(new: NewSchedule, created_at: DateTime<Utc>) -> Result<Self, ValidationError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        let owner_id = new.owner_id.trim();
        if owner_id.is_empty() {
            return Err(ValidationError::EmptyField("owner_id"));
        }
        if new.times_of_day.is_empty() {
            return Err(ValidationError::NoTimesOfDay);
        }

        let times: BTreeSet<NaiveTime> = new
            .times_of_day
            .iter()
            .map(|raw| parse_time_of_day(raw.trim()))
            .collect::<Result<_, _>>()?;

        if let Some(expected) = new.frequency.expected_times() {
            if times.len() != expected {
                return Err(ValidationError::FrequencyMismatch {
                    frequency: new.frequency.to_string(),
                    expected,
                    actual: times.len(),
                });
            }
        }

        if let Some(end) = new.end_date {
            if end < new.start_date {
                return Err(ValidationError::InvalidDateRange {
                    start: new.start_date,
                    end,
                });
            }
        }

        Ok(Self {
            id: format!("sched-{}", uuid::Uuid::new_v4()),
            owner_id: owner_id.to_string(),
            kind: new.kind,
            name: name.to_string(),
            dosage_or_description: new.dosage_or_description.trim().to_string(),
            frequency: new.frequency,
            times_of_day: times.into_iter().collect(),
            start_date: new.start_date,
            end_date: new.end_date,
            is_active: true,
            created_at,
        })
    }

    /// Whether `date` falls inside `[start_date, end_date]`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }
}
