//! Loads persisted state for one CLI invocation and writes it back.

use std::error::Error;

use timerdeck_core::{Config, Database, PersistenceGateway, TimerEngine};

pub struct Session {
    pub config: Config,
    pub gateway: PersistenceGateway,
    pub engine: TimerEngine,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let gateway = open_gateway(&config)?;
        let engine = TimerEngine::restore(&gateway);
        Ok(Self {
            config,
            gateway,
            engine,
        })
    }

    /// Write timers and history back to the database.
    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        self.gateway.save_timers(self.engine.timers())?;
        self.gateway.save_logs(self.engine.logs())?;
        Ok(())
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve(&self, id_or_prefix: &str) -> Result<String, Box<dyn Error>> {
        resolve_id(self.engine.timers().iter().map(|t| t.id.as_str()), id_or_prefix)
    }
}

pub fn open_gateway(config: &Config) -> Result<PersistenceGateway, Box<dyn Error>> {
    let db = Database::open(&config.database_path()?)?;
    Ok(PersistenceGateway::new(db))
}

pub fn resolve_id<'a>(
    ids: impl Iterator<Item = &'a str>,
    id_or_prefix: &str,
) -> Result<String, Box<dyn Error>> {
    let mut matches = Vec::new();
    for id in ids {
        if id == id_or_prefix {
            return Ok(id.to_string());
        }
        if id.starts_with(id_or_prefix) {
            matches.push(id);
        }
    }
    match matches.as_slice() {
        [one] => Ok(one.to_string()),
        [] => Err(format!("no timer matches '{id_or_prefix}'").into()),
        _ => Err(format!("'{id_or_prefix}' matches {} timers; use more characters", matches.len()).into()),
    }
}
