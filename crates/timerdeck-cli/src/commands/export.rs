use std::path::PathBuf;

use chrono::Utc;
use clap::Args;

use crate::session::Session;

#[derive(Args)]
pub struct ExportArgs {
    /// Write to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

pub fn run(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open()?;
    let json = session
        .gateway
        .export_snapshot(Utc::now())
        .map_err(|e| format!("failed to export timer data: {e}"))?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, json)
                .map_err(|e| format!("failed to export timer data to {}: {e}", path.display()))?;
            eprintln!("Timer data exported to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
