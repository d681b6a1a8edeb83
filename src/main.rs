use std::sync::Arc;

use anyhow::Result;
use creaviaggi::api::AppState;
use creaviaggi::{CreaViaggiConfig, VERSION, telemetry, web};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = CreaViaggiConfig::load()?;
    telemetry::setup_tracing(&config.logging)?;

    info!("CreaViaggi {} starting", VERSION);
    if !config.backend_configured() {
        info!("Text generation disabled: set OPENROUTER_API_KEY to enable it");
    }

    let state = Arc::new(AppState::from_config(&config)?);
    web::run(state, config.server.port).await
}
