use std::time::Duration;

use anyhow::Context;

use intelplat_api::{app, config::AppConfig};

const PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    intelplat_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let state = app::services::build_state(&config).await?;

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tick.tick().await;
            sessions.purge_expired();
        }
    });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app::build_app(state)).await?;
    Ok(())
}
