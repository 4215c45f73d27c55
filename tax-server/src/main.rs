use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tax_core::{BracketCache, TaxCalculator};
use tax_data::HttpBracketSource;
use tax_server::{AppState, Config, logging, routes};
use tokio::net::TcpListener;
use tracing::{error, info};

// --- Entry point ---

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    logging::init_logging(config.log_file.as_deref())?;

    let source = HttpBracketSource::new(config.fetch_config())
        .context("failed to build tax data client")?;
    let cache = BracketCache::new(Arc::new(source), config.cache_config());
    let state = AppState::new(TaxCalculator::new(cache));

    let app = routes::router(state, &config.static_dir);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        %addr,
        tax_api_url = %config.tax_api_url,
        cache_ttl = %humantime::format_duration(config.cache_ttl),
        "starting tax calculator server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(error) => {
            error!(%error, "cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
