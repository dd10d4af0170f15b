use chrono::Local;
use clap::Args;
use timerdeck_core::{format_clock, TimerLog};

use crate::session::Session;

#[derive(Args)]
pub struct HistoryArgs {
    /// Only show entries from this category
    #[arg(long, short)]
    category: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open()?;
    let logs: Vec<&TimerLog> = session
        .engine
        .logs()
        .iter()
        .filter(|log| args.category.as_ref().map_or(true, |c| &log.category == c))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
        return Ok(());
    }

    if logs.is_empty() {
        println!("No completed timers yet.");
        return Ok(());
    }

    for log in logs {
        let completed = log
            .completed_at_utc()
            .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".into());
        println!(
            "{:<20} {:<12} duration {:>6}  completed {}",
            log.name,
            log.category,
            format_clock(log.duration),
            completed
        );
    }
    Ok(())
}
