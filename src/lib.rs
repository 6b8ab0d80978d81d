pub mod config;
pub mod controller;
pub mod form;
pub mod handoff;
pub mod models;
pub mod navigation;
pub mod prediction;
pub mod shell;
pub mod submission;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ConfigError};
use crate::prediction::{HttpPredictionClient, PredictionError};
use crate::shell::{start_shell_server, ShellContext};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Prediction client error: {0}")]
    Client(#[from] PredictionError),

    #[error("Shell server error: {0}")]
    Server(String),
}

/// Start the shell and serve until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env()?;
    let client = HttpPredictionClient::from_config(&config.prediction)?;
    tracing::info!(
        endpoint = client.endpoint(),
        timeout_secs = config.prediction.timeout_secs,
        "Prediction client ready"
    );

    let ctx = ShellContext::new(Arc::new(client));
    let mut server = start_shell_server(config.bind_addr, ctx)
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(url = %server.url(), "Open the evaluation form in a browser");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {e}");
    }

    server.shutdown();
    server.stopped().await;
    Ok(())
}
