use clap::Subcommand;
use serde::Serialize;
use timerdeck_core::Timer;

use super::timer::print_timer_line;
use crate::session::Session;

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List timers grouped by category
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print only category names, in first-use order
        #[arg(long, conflicts_with = "json")]
        names: bool,
    },
    /// Start every non-completed timer in a category
    Start {
        /// Category name (exact match)
        category: String,
    },
    /// Pause every running timer in a category
    Pause {
        /// Category name (exact match)
        category: String,
    },
    /// Reset every timer in a category
    Reset {
        /// Category name (exact match)
        category: String,
    },
}

#[derive(Serialize)]
struct GroupView<'a> {
    category: &'a str,
    has_running: bool,
    has_pending: bool,
    timers: &'a [Timer],
}

pub fn run(action: CategoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;

    let category = match action {
        CategoryAction::List { names: true, .. } => {
            for category in session.engine.store().categories() {
                println!("{category}");
            }
            return Ok(());
        }
        CategoryAction::List { json, .. } => {
            let groups = session.engine.category_groups();
            if json {
                let views: Vec<GroupView<'_>> = groups
                    .iter()
                    .map(|g| GroupView {
                        category: &g.category,
                        has_running: g.has_running(),
                        has_pending: g.has_pending(),
                        timers: &g.timers,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else if groups.is_empty() {
                println!("No timers yet.");
            } else {
                for group in &groups {
                    println!(
                        "{} ({} timers, {} completed)",
                        group.category,
                        group.timers.len(),
                        group.completed_count()
                    );
                    for timer in &group.timers {
                        print!("  ");
                        print_timer_line(timer);
                    }
                }
            }
            return Ok(());
        }
        CategoryAction::Start { category } => {
            session.engine.start_category(&category);
            category
        }
        CategoryAction::Pause { category } => {
            session.engine.pause_category(&category);
            category
        }
        CategoryAction::Reset { category } => {
            session.engine.reset_category(&category);
            category
        }
    };

    session.save()?;
    let groups = session.engine.timers_by_category();
    match groups.get(&category) {
        Some(timers) => println!("{}", serde_json::to_string_pretty(timers)?),
        None => eprintln!("no timers in category '{category}'"),
    }
    Ok(())
}
