use std::path::{Path, PathBuf};
use std::sync::Arc;

use carecadence_core::schedule::parse_time_of_day;
use carecadence_core::{
    DateWindow, DaySummary, NotificationCenter, NotificationEvent, OverallAdherence,
    ReminderEngine, SimulatedClock, SweepReport,
};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use clap::Args;
use serde::Serialize;

#[derive(Args)]
pub struct SimulateArgs {
    /// Schedules file (TOML, one [[schedules]] table per schedule)
    pub file: PathBuf,
    /// Local wall-clock time to simulate, e.g. 2024-01-01T09:00
    #[arg(long, value_parser = parse_at)]
    pub at: NaiveDateTime,
    /// Mark an occurrence completed before the sweep
    #[arg(long = "complete", value_name = "NAME@HH:MM", value_parser = parse_action)]
    pub complete: Vec<Action>,
    /// Mark an occurrence skipped before the sweep
    #[arg(long = "skip", value_name = "NAME@HH:MM", value_parser = parse_action)]
    pub skip: Vec<Action>,
    /// Days in the trailing adherence window
    #[arg(long, default_value_t = 7)]
    pub days: u32,
}

/// One `NAME@HH:MM` reference to an occurrence on the simulated date.
#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub time: NaiveTime,
}

#[derive(Serialize)]
struct SimulationOutput {
    now: NaiveDateTime,
    sweep: SweepReport,
    today: DaySummary,
    adherence: OverallAdherence,
    notifications: Vec<NotificationEvent>,
}

fn parse_at(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM: {e}"))
}

fn parse_action(raw: &str) -> Result<Action, String> {
    let (name, time) = raw
        .rsplit_once('@')
        .ok_or_else(|| format!("expected NAME@HH:MM, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing schedule name in '{raw}'"));
    }
    let time = parse_time_of_day(time.trim()).map_err(|e| e.to_string())?;
    Ok(Action {
        name: name.to_string(),
        time,
    })
}

pub fn run(args: SimulateArgs, config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let schedules = super::load_schedules(&args.file)?;

    // The clock runs in UTC; shift so the engine's local time equals --at.
    let offset = Duration::minutes(i64::from(config.utc_offset_minutes));
    let clock = SimulatedClock::at(args.at - offset);
    let center = Arc::new(NotificationCenter::new(config.notification_capacity));
    let mut engine = ReminderEngine::new(config, clock, Arc::clone(&center));

    for new in schedules.schedules {
        let name = new.name.clone();
        engine
            .create_schedule(new)
            .map_err(|e| format!("schedule '{name}': {e}"))?;
    }

    let today = engine.today();
    for action in &args.complete {
        let id = find_occurrence(&mut engine, action)?;
        engine.mark_completed(&id, None)?;
    }
    for action in &args.skip {
        let id = find_occurrence(&mut engine, action)?;
        engine.mark_skipped(&id, Some("skipped from cli".to_string()))?;
    }

    let sweep = engine.sweep();
    let output = SimulationOutput {
        now: engine.now_local(),
        sweep,
        today: engine.day_summary(today),
        adherence: engine.overall_adherence(None, DateWindow::trailing(today, args.days)),
        notifications: center.list(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn find_occurrence(
    engine: &mut ReminderEngine<SimulatedClock, Arc<NotificationCenter>>,
    action: &Action,
) -> Result<String, Box<dyn std::error::Error>> {
    let today = engine.today();
    engine
        .entries_for(today)
        .into_iter()
        .find(|e| e.schedule_name == action.name && e.occurrence.scheduled_at.time() == action.time)
        .map(|e| e.occurrence.id)
        .ok_or_else(|| {
            format!(
                "no occurrence of '{}' at {} on {today}",
                action.name,
                action.time.format("%H:%M")
            )
            .into()
        })
}
