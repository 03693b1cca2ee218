pub mod api; // HTTP JSON API
pub mod composition; // Formula composition resolver
pub mod config;
pub mod core_state;
pub mod custom_formula; // Custom formula blob recovery
pub mod db;
pub mod import; // Bulk formula import
pub mod interactions; // Advisory interaction flags
pub mod models;
pub mod normalize; // Inbound field-name adapters
pub mod prescription; // Prescription view and draft builder
pub mod print; // PDF printout
pub mod settings;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Start the clinic service and block until Ctrl-C.
pub async fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let server_config = config::ServerConfig::from_env();
    let core = Arc::new(core_state::CoreState::new(server_config.db_path.clone()));

    // Run migrations before accepting requests.
    core.open_db().map_err(|e| e.to_string())?;
    tracing::info!(db = %server_config.db_path.display(), "Database ready");

    let mut server = api::start_api_server(core, server_config.addr).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
