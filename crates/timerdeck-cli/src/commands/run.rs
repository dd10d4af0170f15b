use std::sync::Arc;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use timerdeck_core::storage::DefaultsConfig;
use timerdeck_core::{
    Command, Config, Event, PersistenceWorker, SharedEngine, TickScheduler, TimerEngine, TimerSpec,
};

use crate::session::{open_gateway, resolve_id};

#[derive(Args)]
pub struct RunArgs {
    /// Exit once no timer is running, even after stdin closes
    #[arg(long)]
    until_idle: bool,
}

/// A line read from stdin while running.
#[derive(Debug, PartialEq)]
enum LineCommand {
    Engine(Command),
    List,
    Quit,
}

fn parse_line(line: &str, defaults: &DefaultsConfig) -> Result<Option<LineCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let arg = || {
        if rest.is_empty() {
            Err(format!("'{verb}' needs an argument"))
        } else {
            Ok(rest.join(" "))
        }
    };

    let command = match verb {
        "start" => Command::Start { timer_id: arg()? },
        "pause" => Command::Pause { timer_id: arg()? },
        "reset" => Command::Reset { timer_id: arg()? },
        "complete" => Command::Complete { timer_id: arg()? },
        "start-category" => Command::StartCategory { category: arg()? },
        "pause-category" => Command::PauseCategory { category: arg()? },
        "reset-category" => Command::ResetCategory { category: arg()? },
        "add" => {
            // add <name> <duration> [category...] [--halfway|--no-halfway]
            let mut halfway = defaults.halfway_alert;
            let mut fields = Vec::with_capacity(rest.len());
            for word in &rest {
                match *word {
                    "--halfway" => halfway = true,
                    "--no-halfway" => halfway = false,
                    other => fields.push(other),
                }
            }
            let (name, duration) = match fields.as_slice() {
                [name, duration, ..] => (*name, *duration),
                _ => {
                    return Err(
                        "usage: add <name> <duration> [category] [--halfway|--no-halfway]".into(),
                    )
                }
            };
            let duration = super::timer::parse_duration(duration)?;
            let category = if fields.len() > 2 {
                fields[2..].join(" ")
            } else {
                defaults.category.clone()
            };
            Command::Add {
                spec: TimerSpec::new(name, category, duration).with_halfway_alert(halfway),
            }
        }
        "list" => return Ok(Some(LineCommand::List)),
        "quit" | "exit" => return Ok(Some(LineCommand::Quit)),
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(LineCommand::Engine(command)))
}

/// Expand an id prefix in commands that name a single timer.
fn resolve_command(engine: &TimerEngine, command: Command) -> Result<Command, String> {
    let resolve = |id: String| {
        resolve_id(engine.timers().iter().map(|t| t.id.as_str()), &id).map_err(|e| e.to_string())
    };
    Ok(match command {
        Command::Start { timer_id } => Command::Start { timer_id: resolve(timer_id)? },
        Command::Pause { timer_id } => Command::Pause { timer_id: resolve(timer_id)? },
        Command::Reset { timer_id } => Command::Reset { timer_id: resolve(timer_id)? },
        Command::Complete { timer_id } => Command::Complete { timer_id: resolve(timer_id)? },
        other => other,
    })
}

fn handle_line(engine: &SharedEngine, config: &Config, line: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let parsed = match parse_line(line, &config.defaults) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return Ok(true),
        Err(message) => {
            eprintln!("{message}");
            return Ok(true);
        }
    };

    match parsed {
        LineCommand::Quit => return Ok(false),
        LineCommand::List => {
            let timers = engine.with(|e| e.timers().to_vec())?;
            for timer in &timers {
                super::timer::print_timer_line(timer);
            }
        }
        LineCommand::Engine(command) => {
            let outcome = engine.with(|e| {
                resolve_command(e, command)
                    .and_then(|cmd| e.apply(cmd).map_err(|err| err.to_string()))
            })?;
            if let Err(message) = outcome {
                eprintln!("{message}");
            }
        }
    }
    Ok(true)
}

fn announce(config: &Config, event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    let enabled = match event {
        Event::HalfwayReached { .. } => config.notifications.halfway,
        Event::TimerCompleted { .. } => config.notifications.completion,
    };
    if enabled {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let gateway = Arc::new(open_gateway(&config)?);
    let (worker, handle) = PersistenceWorker::spawn(Arc::clone(&gateway));
    let engine = SharedEngine::new(TimerEngine::restore_with(&gateway, handle));
    let mut events = engine.with(|e| e.subscribe())?;

    let scheduler = TickScheduler::start(engine.clone(), config.tick_interval());
    tracing::info!("running; type commands on stdin, Ctrl-C to stop");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut idle_check = tokio::time::interval(config.tick_interval());

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("interrupted");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !handle_line(&engine, &config, &line)? {
                        break;
                    }
                }
                Ok(None) if args.until_idle => stdin_open = false,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin closed");
                    stdin_open = false;
                }
            },
            event = events.recv() => match event {
                Ok(event) => announce(&config, &event)?,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event output fell behind");
                }
                Err(RecvError::Closed) => break,
            },
            _ = idle_check.tick(), if args.until_idle => {
                if engine.with(|e| e.store().running_count())? == 0 {
                    break;
                }
            }
        }
    }

    scheduler.stop().await;
    // Print anything raised by the final tick.
    while let Ok(event) = events.try_recv() {
        announce(&config, &event)?;
    }

    engine.with(|e| drop(e.take_persistence()))?;
    let stats = worker.finish().await;
    if stats.failures > 0 {
        eprintln!("warning: {} save(s) failed; recent changes may not be on disk", stats.failures);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use timerdeck_core::TimerStore;

    fn defaults(category: &str, halfway_alert: bool) -> DefaultsConfig {
        DefaultsConfig {
            category: category.into(),
            halfway_alert,
        }
    }

    #[test]
    fn parses_engine_commands() {
        let d = defaults("General", false);
        assert_eq!(
            parse_line("start abc", &d).unwrap(),
            Some(LineCommand::Engine(Command::Start { timer_id: "abc".into() }))
        );
        assert_eq!(
            parse_line("pause-category Deep Work", &d).unwrap(),
            Some(LineCommand::Engine(Command::PauseCategory { category: "Deep Work".into() }))
        );
        assert_eq!(parse_line("   ", &d).unwrap(), None);
        assert_eq!(parse_line("quit", &d).unwrap(), Some(LineCommand::Quit));
    }

    #[test]
    fn parses_add_with_default_category() {
        let parsed = parse_line("add Tea 3m", &defaults("Home", false)).unwrap();
        assert_eq!(
            parsed,
            Some(LineCommand::Engine(Command::Add { spec: TimerSpec::new("Tea", "Home", 180) }))
        );
    }

    #[test]
    fn add_uses_default_halfway_and_per_line_flags() {
        let on = defaults("Home", true);
        let spec = |line: &str, d: &DefaultsConfig| match parse_line(line, d).unwrap() {
            Some(LineCommand::Engine(Command::Add { spec })) => spec,
            other => panic!("expected add, got {other:?}"),
        };

        assert!(spec("add Tea 4", &on).halfway_alert_enabled);
        assert!(!spec("add Tea 4 --no-halfway", &on).halfway_alert_enabled);

        let off = defaults("Home", false);
        let flagged = spec("add Tea 4 --halfway Deep Work", &off);
        assert!(flagged.halfway_alert_enabled);
        assert_eq!(flagged.category, "Deep Work");
        assert!(parse_line("add --halfway Tea", &off).is_err());
    }

    #[test]
    fn handle_line_add_honors_configured_halfway() {
        let mut config = Config::default();
        config.defaults.halfway_alert = true;
        let engine = SharedEngine::new(TimerEngine::new(TimerStore::new()));

        assert!(handle_line(&engine, &config, "add Tea 4").unwrap());
        let timers = engine.with(|e| e.timers().to_vec()).unwrap();
        assert_eq!(timers.len(), 1);
        assert!(timers[0].halfway_alert_enabled);
        assert_eq!(timers[0].category, "General");
    }

    #[test]
    fn rejects_malformed_lines() {
        let d = defaults("General", false);
        assert!(parse_line("start", &d).is_err());
        assert!(parse_line("add Tea", &d).is_err());
        assert!(parse_line("launch x", &d).is_err());
    }

    #[test]
    fn resolves_prefixes_against_engine() {
        let mut engine = TimerEngine::new(TimerStore::new());
        let id = engine.add_timer(TimerSpec::new("Tea", "Home", 3)).unwrap();
        let resolved = resolve_command(&engine, Command::Start { timer_id: id[..6].to_string() }).unwrap();
        assert_eq!(resolved, Command::Start { timer_id: id });
    }
}
