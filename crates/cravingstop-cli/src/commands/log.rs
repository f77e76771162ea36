use chrono::Local;
use clap::Subcommand;
use cravingstop_core::AppendOutcome;
use serde_json::json;

use crate::session::{self, format_duration};

#[derive(Subcommand)]
pub enum LogAction {
    /// Log a resisted duration
    Add {
        /// Duration in milliseconds
        #[arg(allow_hyphen_values = true)]
        duration_ms: i64,
    },
    /// List logged durations, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: LogAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = session::open()?;

    match action {
        LogAction::Add { duration_ms } => {
            let outcome = session.sync.append(duration_ms);
            let report = match &outcome {
                AppendOutcome::Ignored => json!({ "result": "ignored" }),
                AppendOutcome::Remote => json!({ "result": "remote" }),
                AppendOutcome::Local { record } => json!({ "result": "local", "record": record }),
                AppendOutcome::FellBack { record } => {
                    json!({ "result": "fell_back", "record": record })
                }
                AppendOutcome::Dropped => json!({ "result": "dropped" }),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(notice) = session.sync.notice() {
                eprintln!("warning: {notice}");
            }
            if outcome == AppendOutcome::Dropped {
                return Err("record could not be saved".into());
            }
        }
        LogAction::List { json } => {
            let records = session.sync.records();
            if json {
                println!("{}", serde_json::to_string_pretty(records)?);
            } else if records.is_empty() {
                println!("No records.");
            } else {
                for record in records {
                    println!(
                        "{}  {}  {}",
                        record
                            .occurred_at
                            .with_timezone(&Local)
                            .format("%Y-%m-%d %H:%M:%S"),
                        format_duration(record.duration_ms),
                        record.id
                    );
                }
            }
        }
    }

    session.sync.shutdown();
    Ok(())
}
