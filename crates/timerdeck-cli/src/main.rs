use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod session;

#[derive(Parser)]
#[command(name = "timerdeck", version, about = "Timerdeck CLI")]
struct Cli {
    /// Log filter level (overrides config `log_level`; RUST_LOG wins over both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer management
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Bulk actions by category
    Category {
        #[command(subcommand)]
        action: commands::category::CategoryAction,
    },
    /// Completed timer history
    History(commands::history::HistoryArgs),
    /// Export timers and history as JSON
    Export(commands::export::ExportArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the tick scheduler in the foreground
    ///
    /// Timers only count down while this runs. Commands are read from stdin
    /// (`add`, `start`, `pause`, `reset`, `complete`, `start-category`,
    /// `pause-category`, `reset-category`, `list`, `quit`). Changes made by
    /// other `timerdeck` invocations meanwhile are overwritten by this
    /// session's next save (last writer wins).
    Run(commands::run::RunArgs),
}

fn init_tracing(cli_level: Option<&str>) {
    let level = cli_level
        .map(str::to_string)
        .unwrap_or_else(|| timerdeck_core::Config::load_or_default().log_level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("timerdeck_core={level},timerdeck={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Category { action } => commands::category::run(action),
        Commands::History(args) => commands::history::run(args),
        Commands::Export(args) => commands::export::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Run(args) => commands::run::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
