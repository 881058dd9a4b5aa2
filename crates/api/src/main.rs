use std::sync::Arc;

use anyhow::Context;

use autohub_api::app::{self, services};
use autohub_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    autohub_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let directory = services::build_directory(&config)
        .await
        .context("failed to open directory")?;

    let report = autohub_infra::bootstrap(directory.as_ref(), config.bootstrap_admin.as_ref())
        .await
        .context("bootstrap failed")?;
    tracing::info!(
        sectors_created = report.sectors_created,
        admin_created = report.admin_created,
        "bootstrap complete"
    );

    let services = Arc::new(services::AppServices::new(&config, directory).context("invalid token secret")?);
    let app = app::build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
