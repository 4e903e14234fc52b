use service_core::observability::init_tracing;
use storefront_service::{config::Config, services::init_metrics, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(
        &config.service_name,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(service = %config.service_name, "Starting storefront service");

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
