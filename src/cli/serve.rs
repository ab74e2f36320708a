use std::fs;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::server::{AppState, create_router};
use crate::store::{SqliteStore, Store};

use super::ServeArgs;

/// Builds the effective config: defaults, then the config file, then flags.
pub fn resolve_config(args: ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(dir) = args.question_sets_dir {
        config.question_sets_dir = dir;
    }

    Ok(config)
}

pub async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if !config.question_sets_dir.is_dir() {
        warn!(
            "Question set directory {} does not exist",
            config.question_sets_dir.display()
        );
    }

    let state = Arc::new(AppState::new(
        Arc::new(store),
        config.question_sets_dir.clone(),
    ));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Database at {}", config.db_path().display());
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
