use clap::Subcommand;
use timerdeck_core::{format_clock, Timer, TimerSpec};

use crate::session::Session;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Create a new (paused) timer
    Add {
        /// Display name
        name: String,
        /// Duration: "90", "1:30", "25m" or "45s"
        #[arg(long, short, value_parser = parse_duration)]
        duration: u32,
        /// Category (defaults to config `defaults.category`)
        #[arg(long, short)]
        category: Option<String>,
        /// Notify when half the duration has elapsed
        #[arg(long, conflicts_with = "no_halfway_alert")]
        halfway_alert: bool,
        /// Never notify at the halfway mark
        #[arg(long)]
        no_halfway_alert: bool,
    },
    /// Start a timer (no-op if completed)
    Start {
        /// Timer ID or unique prefix
        id: String,
    },
    /// Pause a running timer
    Pause {
        /// Timer ID or unique prefix
        id: String,
    },
    /// Reset a timer to its full duration
    Reset {
        /// Timer ID or unique prefix
        id: String,
    },
    /// Mark a timer completed without recording history
    Complete {
        /// Timer ID or unique prefix
        id: String,
    },
    /// List all timers
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one timer as JSON
    Show {
        /// Timer ID or unique prefix
        id: String,
    },
}

/// Accepts `90`, `1:30`, `25m` or `45s`.
pub fn parse_duration(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    let invalid = || format!("invalid duration '{raw}'");
    let secs = if let Some((m, s)) = raw.split_once(':') {
        let m: u32 = m.parse().map_err(|_| invalid())?;
        let s: u32 = s.parse().map_err(|_| invalid())?;
        if s >= 60 {
            return Err(invalid());
        }
        m.checked_mul(60).and_then(|m| m.checked_add(s)).ok_or_else(invalid)?
    } else if let Some(m) = raw.strip_suffix('m') {
        let m: u32 = m.parse().map_err(|_| invalid())?;
        m.checked_mul(60).ok_or_else(invalid)?
    } else {
        raw.strip_suffix('s').unwrap_or(raw).parse().map_err(|_| invalid())?
    };
    if secs == 0 {
        return Err("duration must be greater than zero".into());
    }
    Ok(secs)
}

pub fn print_timer_line(timer: &Timer) {
    println!(
        "{}  {:<20} {:<12} {:<9} {:>6} / {:<6} {:>3.0}%",
        timer.id.chars().take(8).collect::<String>(),
        timer.name,
        timer.category,
        timer.status.as_str(),
        format_clock(timer.remaining_time),
        format_clock(timer.duration),
        timer.progress() * 100.0,
    );
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;

    match action {
        TimerAction::Add {
            name,
            duration,
            category,
            halfway_alert,
            no_halfway_alert,
        } => {
            let category = category.unwrap_or_else(|| session.config.defaults.category.clone());
            let halfway = (session.config.defaults.halfway_alert || halfway_alert) && !no_halfway_alert;
            let spec = TimerSpec::new(name, category, duration).with_halfway_alert(halfway);
            let id = session.engine.add_timer(spec)?;
            session.save()?;
            if let Some(timer) = session.engine.get(&id) {
                println!("{}", serde_json::to_string_pretty(timer)?);
            }
        }
        TimerAction::Start { id } => {
            let id = session.resolve(&id)?;
            session.engine.start(&id);
            session.save()?;
            print_state(&session, &id)?;
        }
        TimerAction::Pause { id } => {
            let id = session.resolve(&id)?;
            session.engine.pause(&id);
            session.save()?;
            print_state(&session, &id)?;
        }
        TimerAction::Reset { id } => {
            let id = session.resolve(&id)?;
            session.engine.reset(&id);
            session.save()?;
            print_state(&session, &id)?;
        }
        TimerAction::Complete { id } => {
            let id = session.resolve(&id)?;
            session.engine.complete(&id);
            session.save()?;
            print_state(&session, &id)?;
        }
        TimerAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(session.engine.timers())?);
            } else if session.engine.timers().is_empty() {
                println!("No timers yet.");
            } else {
                for timer in session.engine.timers() {
                    print_timer_line(timer);
                }
            }
        }
        TimerAction::Show { id } => {
            let id = session.resolve(&id)?;
            print_state(&session, &id)?;
        }
    }

    Ok(())
}

fn print_state(session: &Session, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(timer) = session.engine.get(id) {
        println!("{}", serde_json::to_string_pretty(timer)?);
    }
    Ok(())
}
