//! Demo site server.
//!
//! # Usage
//!
//! ```bash
//! cp demos/site/.env.example .env
//! cargo run -p pageflow-demo
//! ```

use anyhow::Context as _;
use metrics_exporter_prometheus::PrometheusBuilder;
use pageflow_demo::{build_router, metrics_router, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        addr = %config.addr(),
        site = %config.site.name,
        menu_file = ?config.site.menu_file,
        render_inline = config.site.render_inline,
        "Configuration loaded"
    );

    pageflow_core::metrics::describe_metrics();
    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let app = build_router(&config.site)?.merge(metrics_router(metrics));

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("binding {}", config.addr()))?;
    tracing::info!(addr = %config.addr(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down gracefully...");
}
