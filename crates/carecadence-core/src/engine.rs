//! Reminder engine: the single entry point for schedule and occurrence
//! mutation.
//!
//! The engine owns the schedule store and the occurrence ledger, reads time
//! from an injected [`Clock`] and pushes notifications into an injected
//! [`NotificationSink`]. It is a plain struct with no hidden global state;
//! multi-threaded hosts share it as a [`SharedEngine`] so user actions and the
//! overdue sweep serialize on the same lock.
//!
//! ## Usage
//!
//! ```ignore
//! let center = Arc::new(NotificationCenter::default());
//! let mut engine = ReminderEngine::new(EngineConfig::default(), SystemClock, Arc::clone(&center));
//! let vit_d = engine.create_schedule(NewSchedule::new("p1", ScheduleKind::Medication, "Vitamin D3", &["08:00"], today))?;
//! let today = engine.occurrences_for(engine.today());
//! engine.mark_completed(&today[0].id, None)?;
//! engine.sweep();
//! ```

use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::adherence::{
    AdherenceCalculator, AdherenceSnapshot, DateWindow, OverallAdherence, ScheduleAdherence,
};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::notify::{NotificationCategory, NotificationEvent, NotificationPriority, NotificationSink};
use crate::occurrence::{generate_for_date, Occurrence, OccurrenceLedger, Transition};
use crate::schedule::{
    format_time_of_day, NewSchedule, ScheduleDefinition, ScheduleFilter, ScheduleKind, ScheduleStore,
};
use crate::sweep::{SweepFailure, SweepReport};

/// Engine shared between the sweep task and user-facing callers.
pub type SharedEngine<C, N> = Arc<Mutex<ReminderEngine<C, N>>>;

/// An occurrence joined with the schedule fields a dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceEntry {
    pub occurrence: Occurrence,
    pub schedule_name: String,
    pub kind: ScheduleKind,
    pub dosage_or_description: String,
}

/// Everything expected on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub entries: Vec<OccurrenceEntry>,
    /// Pooled over every occurrence of the day.
    pub adherence: AdherenceSnapshot,
}

/// Scheduled reminder and adherence tracking engine.
pub struct ReminderEngine<C: Clock, N: NotificationSink> {
    config: EngineConfig,
    clock: C,
    sink: N,
    schedules: ScheduleStore,
    ledger: OccurrenceLedger,
    calculator: AdherenceCalculator,
    last_sweep_date: Option<NaiveDate>,
}

impl<C: Clock, N: NotificationSink> ReminderEngine<C, N> {
    pub fn new(config: EngineConfig, clock: C, sink: N) -> Self {
        let calculator = AdherenceCalculator::with_thresholds(config.adherence);
        Self {
            config,
            clock,
            sink,
            schedules: ScheduleStore::new(),
            ledger: OccurrenceLedger::new(),
            calculator,
            last_sweep_date: None,
        }
    }

    /// Wrap the engine for sharing with a [`crate::SweepTask`].
    pub fn into_shared(self) -> SharedEngine<C, N> {
        Arc::new(Mutex::new(self))
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current local wall-clock time under the configured offset.
    pub fn now_local(&self) -> NaiveDateTime {
        self.clock
            .now()
            .with_timezone(&self.config.timezone())
            .naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now_local().date()
    }

    pub fn schedule(&self, id: &str) -> Result<&ScheduleDefinition> {
        self.schedules.get(id)
    }

    pub fn schedules(&self, filter: &ScheduleFilter) -> Vec<&ScheduleDefinition> {
        self.schedules.list(filter)
    }

    pub fn occurrence(&self, id: &str) -> Result<&Occurrence> {
        self.ledger.get(id)
    }

    /// Every occurrence scheduled on `date`, generating them first if this
    /// is the first access to that date.
    pub fn occurrences_for(&mut self, date: NaiveDate) -> Vec<Occurrence> {
        self.entries_for(date)
            .into_iter()
            .map(|entry| entry.occurrence)
            .collect()
    }

    /// Occurrences of `date` with their schedule details, ordered by time.
    pub fn entries_for(&mut self, date: NaiveDate) -> Vec<OccurrenceEntry> {
        self.ensure_generated(date);
        let window = DateWindow::day(date);
        let mut entries: Vec<OccurrenceEntry> = self
            .schedules
            .list(&ScheduleFilter::history())
            .into_iter()
            .flat_map(|schedule| {
                self.ledger
                    .for_schedule(&schedule.id, window.first_instant(), window.last_instant())
                    .into_iter()
                    .map(move |occ| entry(schedule, occ))
            })
            .collect();
        entries.sort_by(|a, b| {
            a.occurrence
                .scheduled_at
                .cmp(&b.occurrence.scheduled_at)
                .then_with(|| a.schedule_name.cmp(&b.schedule_name))
        });
        entries
    }

    /// Today's pending occurrences that are not yet due, soonest first.
    pub fn upcoming(&mut self, limit: usize) -> Vec<OccurrenceEntry> {
        let now = self.now_local();
        self.ensure_generated(now.date());
        let end_of_day = DateWindow::day(now.date()).last_instant();
        self.ledger
            .pending_between(now, end_of_day)
            .into_iter()
            .filter_map(|occ| {
                self.schedules
                    .get(&occ.schedule_id)
                    .ok()
                    .map(|schedule| entry(schedule, occ))
            })
            .take(limit)
            .collect()
    }

    pub fn day_summary(&mut self, date: NaiveDate) -> DaySummary {
        let entries = self.entries_for(date);
        let now = self.now_local();
        let adherence = self.calculator.snapshot(
            DateWindow::day(date),
            entries.iter().map(|e| &e.occurrence),
            now,
        );
        DaySummary {
            date,
            entries,
            adherence,
        }
    }

    /// Adherence of one schedule over `window`.
    pub fn adherence(&mut self, schedule_id: &str, window: DateWindow) -> Result<AdherenceSnapshot> {
        self.schedules.get(schedule_id)?;
        self.generate_window(window);
        Ok(self.snapshot_for(schedule_id, window))
    }

    /// Unweighted mean of each active schedule's rate over `window`,
    /// optionally restricted to one owner.
    pub fn overall_adherence(&mut self, owner_id: Option<&str>, window: DateWindow) -> OverallAdherence {
        self.generate_window(window);
        let mut filter = ScheduleFilter::active();
        if let Some(owner) = owner_id {
            filter = filter.for_owner(owner);
        }
        let per_schedule: Vec<ScheduleAdherence> = self
            .schedules
            .list(&filter)
            .into_iter()
            .map(|schedule| ScheduleAdherence {
                schedule_id: schedule.id.clone(),
                name: schedule.name.clone(),
                snapshot: self.snapshot_for(&schedule.id, window),
            })
            .collect();
        self.calculator.overall(window, per_schedule)
    }

    // ── Schedule commands ────────────────────────────────────────────

    /// Validate and register a schedule.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Validation`] for malformed input; nothing is stored.
    pub fn create_schedule(&mut self, new: NewSchedule) -> Result<ScheduleDefinition> {
        let schedule = self.schedules.create(new, self.clock.now())?;
        tracing::info!(
            schedule_id = %schedule.id,
            kind = %schedule.kind,
            name = %schedule.name,
            times = schedule.times_of_day.len(),
            "schedule created"
        );
        Ok(schedule)
    }

    /// Stop generating occurrences for a schedule; history is kept.
    pub fn retire_schedule(&mut self, id: &str) -> Result<ScheduleDefinition> {
        let schedule = self.schedules.retire(id)?;
        tracing::info!(schedule_id = %id, "schedule retired");
        Ok(schedule)
    }

    // ── Occurrence commands ──────────────────────────────────────────

    /// PENDING → COMPLETED at `at` (defaults to now). Completing an already
    /// completed occurrence is a no-op.
    pub fn mark_completed(&mut self, id: &str, at: Option<NaiveDateTime>) -> Result<Occurrence> {
        let at = at.unwrap_or_else(|| self.now_local());
        let (transition, occurrence) = self.ledger.apply(id, |occ| occ.complete(at))?;
        if transition == Transition::Applied {
            tracing::info!(occurrence_id = %id, %at, "occurrence completed");
        }
        Ok(occurrence)
    }

    /// PENDING → SKIPPED with an optional reason.
    pub fn mark_skipped(&mut self, id: &str, reason: Option<String>) -> Result<Occurrence> {
        let (transition, occurrence) = self.ledger.apply(id, |occ| occ.skip(reason))?;
        if transition == Transition::Applied {
            tracing::info!(occurrence_id = %id, "occurrence skipped");
        }
        Ok(occurrence)
    }

    /// PENDING → MISSED once overdue, emitting exactly one missed
    /// notification.
    pub fn mark_missed(&mut self, id: &str) -> Result<Occurrence> {
        let schedule_id = self.ledger.get(id)?.schedule_id.clone();
        let schedule = self.schedules.get(&schedule_id)?;
        let now = self.now_local();
        let grace = self.config.grace_period();
        let (transition, occurrence) = self.ledger.apply(id, |occ| occ.miss(now, grace))?;
        if transition == Transition::Applied && occurrence.notified_missed {
            self.sink.push(missed_notification(schedule, &occurrence, self.clock.now()));
            tracing::info!(occurrence_id = %id, schedule = %schedule.name, "occurrence missed");
        }
        Ok(occurrence)
    }

    // ── Sweep ────────────────────────────────────────────────────────

    /// One overdue sweep tick.
    ///
    /// Scans every pending occurrence that is overdue right now, not only
    /// those that became overdue since the previous tick, so it is safe to
    /// call after the host was suspended. A failure on one occurrence is
    /// logged and recorded; the rest of the tick continues.
    pub fn sweep(&mut self) -> SweepReport {
        let now = self.now_local();
        let today = now.date();
        let floor = today - Duration::days(i64::from(self.config.catch_up_days));
        let from = self.last_sweep_date.map_or(today, |last| last.max(floor));

        let mut report = SweepReport::new(now);
        for date in DateWindow::new(from, today).dates() {
            report.generated += self.ensure_generated(date);
        }
        self.last_sweep_date = Some(today);

        let cutoff = now - self.config.grace_period();
        let overdue: Vec<String> = self
            .ledger
            .pending_through(cutoff)
            .into_iter()
            .filter(|occ| occ.scheduled_at < cutoff)
            .map(|occ| occ.id.clone())
            .collect();

        for id in overdue {
            match self.mark_missed(&id) {
                Ok(_) => report.missed.push(id),
                Err(e) => {
                    tracing::warn!(occurrence_id = %id, error = %e, "sweep could not mark occurrence missed");
                    report.failures.push(SweepFailure {
                        occurrence_id: id,
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(lead) = self.config.reminder_lead() {
            self.send_reminders(now, lead, &mut report);
        }

        if report.has_activity() {
            tracing::info!(
                generated = report.generated,
                missed = report.missed.len(),
                reminded = report.reminded.len(),
                failures = report.failures.len(),
                "sweep finished"
            );
        }
        report
    }

    fn send_reminders(&mut self, now: NaiveDateTime, lead: Duration, report: &mut SweepReport) {
        let due_soon: Vec<(String, String)> = self
            .ledger
            .pending_between(now, now + lead)
            .into_iter()
            .filter(|occ| !occ.notified_reminder)
            .map(|occ| (occ.id.clone(), occ.schedule_id.clone()))
            .collect();

        for (id, schedule_id) in due_soon {
            let schedule = match self.schedules.get(&schedule_id) {
                Ok(schedule) => schedule,
                Err(e) => {
                    tracing::warn!(occurrence_id = %id, error = %e, "reminder skipped");
                    report.failures.push(SweepFailure {
                        occurrence_id: id,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            match self.ledger.claim_reminder(&id) {
                Ok(true) => {
                    if let Ok(occ) = self.ledger.get(&id) {
                        self.sink.push(reminder_notification(schedule, occ, self.clock.now()));
                    }
                    report.reminded.push(id);
                }
                Ok(false) => {}
                Err(e) => report.failures.push(SweepFailure {
                    occurrence_id: id,
                    error: e.to_string(),
                }),
            }
        }
    }

    // ── Generation ───────────────────────────────────────────────────

    /// Expand every active schedule for `date` unless already done. The
    /// schedule's own `start_date..=end_date` is the only bound.
    fn ensure_generated(&mut self, date: NaiveDate) -> usize {
        let mut created = 0;
        for schedule in self.schedules.list(&ScheduleFilter::active()) {
            if self.ledger.is_generated(&schedule.id, date) {
                continue;
            }
            created += generate_for_date(schedule, date, &mut self.ledger).created.len();
        }
        created
    }

    fn generate_window(&mut self, window: DateWindow) {
        let today = self.today();
        if window.start > today {
            return;
        }
        for date in DateWindow::new(window.start, window.end.min(today)).dates() {
            self.ensure_generated(date);
        }
    }

    fn snapshot_for(&self, schedule_id: &str, window: DateWindow) -> AdherenceSnapshot {
        let occurrences =
            self.ledger
                .for_schedule(schedule_id, window.first_instant(), window.last_instant());
        self.calculator.snapshot(window, occurrences, self.now_local())
    }
}

fn entry(schedule: &ScheduleDefinition, occ: &Occurrence) -> OccurrenceEntry {
    OccurrenceEntry {
        occurrence: occ.clone(),
        schedule_name: schedule.name.clone(),
        kind: schedule.kind,
        dosage_or_description: schedule.dosage_or_description.clone(),
    }
}

fn describe(schedule: &ScheduleDefinition) -> String {
    if schedule.dosage_or_description.is_empty() {
        schedule.name.clone()
    } else {
        format!("{} ({})", schedule.name, schedule.dosage_or_description)
    }
}

fn clock_label(at: NaiveDateTime) -> String {
    format_time_of_day(at.time())
}

fn missed_notification(
    schedule: &ScheduleDefinition,
    occ: &Occurrence,
    created_at: chrono::DateTime<chrono::Utc>,
) -> NotificationEvent {
    let (priority, verb) = match schedule.kind {
        ScheduleKind::Medication => (NotificationPriority::High, "taken"),
        ScheduleKind::Activity => (NotificationPriority::Normal, "done"),
    };
    NotificationEvent::new(
        NotificationCategory::Missed,
        priority,
        format!("Missed {}: {}", schedule.kind, schedule.name),
        format!(
            "{} was scheduled for {} on {} and was not marked as {}.",
            describe(schedule),
            clock_label(occ.scheduled_at),
            occ.scheduled_at.date(),
            verb
        ),
        created_at,
    )
    .for_occurrence(occ.id.clone())
}

fn reminder_notification(
    schedule: &ScheduleDefinition,
    occ: &Occurrence,
    created_at: chrono::DateTime<chrono::Utc>,
) -> NotificationEvent {
    NotificationEvent::new(
        NotificationCategory::Reminder,
        NotificationPriority::Normal,
        format!("Upcoming {}: {}", schedule.kind, schedule.name),
        format!("{} is due at {}.", describe(schedule), clock_label(occ.scheduled_at)),
        created_at,
    )
    .for_occurrence(occ.id.clone())
}
