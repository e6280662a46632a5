use std::sync::Arc;

use anyhow::{Context, Result};
use cinema_search::api;
use cinema_search::catalog::CatalogClient;
use cinema_search::config::AppConfig;
use cinema_search::indexer::TantivyBackend;
use cinema_search::service::MovieService;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .pretty()
        .init();

    let config = AppConfig::from_env()?;
    info!(
        index_dir = %config.index_dir.display(),
        index_name = %config.index_name,
        catalog_url = %config.catalog_url,
        fetch_concurrency = config.fetch_concurrency,
        bind_addr = %config.bind_addr,
        "loaded configuration"
    );

    let backend = TantivyBackend::open(&config.index_dir)
        .with_context(|| format!("opening index root at {}", config.index_dir.display()))?;
    let catalog = CatalogClient::new(
        config.catalog_url.clone(),
        config.fetch_concurrency,
        config.fetch_timeout,
    )
    .context("building catalog client")?;
    let service = MovieService::new(
        Arc::new(backend),
        catalog,
        config.index_name.clone(),
        config.backend_timeout,
    );

    let app = api::router(api::AppState::new(service));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "starting http server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
