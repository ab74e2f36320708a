mod commands;
mod info;
mod serve;

pub use commands::{AdminCommands, ServeArgs};
pub use info::run_info;
pub use serve::{resolve_config, run_serve};

use std::fs;
use std::path::Path;

use crate::config::ServerConfig;
use crate::store::{SqliteStore, Store};

/// Open the store in an existing data directory
pub fn init_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    let db_path = ServerConfig::db_path_in(data_dir);

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'orgpulse admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}

/// Create the data directory and apply the schema. Safe to run again.
pub fn run_init(data_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir)?;

    let db_path = ServerConfig::db_path_in(data_dir);
    let existed = db_path.exists();

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    if existed {
        println!("Database already initialized at {}", db_path.display());
    } else {
        println!("Initialized database at {}", db_path.display());
    }

    Ok(())
}
