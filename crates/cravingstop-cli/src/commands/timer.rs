use clap::Subcommand;
use cravingstop_core::storage::Database;
use cravingstop_core::timer::Stopwatch;
use cravingstop_core::{now_ms, Event};

use crate::session;

const STOPWATCH_KEY: &str = "stopwatch";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Press the button: arm, reset within 250 ms, or stop and log
    Click,
    /// Advance the stopwatch to now
    Tick,
    /// Print current stopwatch state as JSON
    Status,
    /// Drop any pending start or running count without logging
    Cancel,
}

fn load_stopwatch(db: &Database) -> Stopwatch {
    if let Ok(Some(json)) = db.kv_get(STOPWATCH_KEY) {
        if let Ok(stopwatch) = serde_json::from_str::<Stopwatch>(&json) {
            return stopwatch;
        }
    }
    Stopwatch::new()
}

fn save_stopwatch(db: &Database, stopwatch: &Stopwatch) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(stopwatch)?;
    db.kv_set(STOPWATCH_KEY, &json)?;
    Ok(())
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut stopwatch = load_stopwatch(&db);

    match action {
        TimerAction::Click => {
            let mut session = session::open()?;
            let events = stopwatch.click(now_ms(), &mut session.sync);
            for event in &events {
                print_event(event)?;
            }
            if let Some(notice) = session.sync.notice() {
                eprintln!("warning: {notice}");
            }
        }
        TimerAction::Tick => {
            if let Some(event) = stopwatch.tick(now_ms()) {
                print_event(&event)?;
            }
            print_event(&stopwatch.snapshot())?;
        }
        TimerAction::Status => {
            // Settle a pending start so the state is current
            if let Some(event) = stopwatch.tick(now_ms()) {
                print_event(&event)?;
            }
            print_event(&stopwatch.snapshot())?;
        }
        TimerAction::Cancel => {
            stopwatch.cancel();
            print_event(&stopwatch.snapshot())?;
        }
    }

    save_stopwatch(&db, &stopwatch)?;
    Ok(())
}
