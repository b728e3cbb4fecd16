use std::sync::Arc;

use anyhow::Context;

use fibdispatch_infra::config::Settings;
use fibdispatch_infra::signal::shutdown_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fibdispatch_observability::init("fibdispatch-api");

    let settings = Settings::from_env().context("invalid configuration")?;
    let services = Arc::new(fibdispatch_api::app::services::build_services(&settings).await?);
    let app = fibdispatch_api::app::build_app(services.clone());

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.listen_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    services.shutdown().await;
    Ok(())
}
