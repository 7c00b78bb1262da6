//! fractal_form server
//!
//! Loads config, connects to the worksheet once, then serves the form.
//!
//! Usage:
//!   cargo run --bin init_sheet      # write the column header (once)
//!   cargo run --bin fractal_form    # start server
//!   cargo run --bin fractal-link -- sign --org "Acme" --expires-in-hours 48

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tracing::{error, info};

use fractal_form::config::{load_dotenv, log_dir_from_env, Config};
use fractal_form::rest::{create_router, AppState};
use fractal_form::storage::GoogleSheetsStore;
use fractal_form::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_file = load_dotenv();
    let _log_guard = init_tracing(log_dir_from_env().as_deref());
    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }
    let config = Config::from_env().inspect_err(|e| error!("Invalid configuration: {e}"))?;

    info!("Connecting to worksheet '{}'...", config.worksheet_name);
    // Connection failure is fatal for the session
    let store = GoogleSheetsStore::connect(&config).await.inspect_err(|e| {
        error!("Não foi possível conectar à aba '{}' da planilha '{}': {e}", config.worksheet_name, config.spreadsheet_name);
    })?;

    let app = create_router(AppState::new(Arc::new(store), &config.link_secret_key));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Form served on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down...");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
