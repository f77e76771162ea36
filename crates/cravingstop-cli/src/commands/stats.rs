use chrono::{Datelike, Local, NaiveDate, Offset};
use clap::Subcommand;
use cravingstop_core::stats::{daily_totals, month_totals, summarize};
use serde_json::json;

use crate::session::{self, format_duration};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals over all records
    Summary,
    /// Per-day totals in local time
    Daily {
        /// Restrict to one month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },
}

fn parse_month(month: &str) -> Result<(i32, u32), Box<dyn std::error::Error>> {
    let first = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| format!("invalid month '{month}', expected YYYY-MM"))?;
    Ok((first.year(), first.month()))
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = session::open()?;
    let records = session.sync.records();

    match action {
        StatsAction::Summary => {
            let summary = summarize(records);
            let report = json!({
                "total_count": summary.total_count,
                "total_ms": summary.total_ms,
                "longest_ms": summary.longest_ms,
                "average_ms": summary.average_ms,
                "total": format_duration(summary.total_ms),
                "longest": format_duration(summary.longest_ms),
                "average": format_duration(summary.average_ms),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatsAction::Daily { month } => {
            let offset = Local::now().offset().fix();
            let days = match month {
                Some(month) => {
                    let (year, month) = parse_month(&month)?;
                    month_totals(records, offset, year, month)
                }
                None => daily_totals(records, offset),
            };
            println!("{}", serde_json::to_string_pretty(&days)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_month() {
        assert_eq!(parse_month("2025-03").unwrap(), (2025, 3));
    }

    #[test]
    fn rejects_bad_month() {
        assert!(parse_month("2025-13").is_err());
        assert!(parse_month("march").is_err());
    }
}
