use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paca_fire_service::app::Application;
use paca_fire_service::config::Config;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,paca_fire_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    info!(
        "Starting PACA fire service (database: {}, departements: {:?}, max fires: {}, cartes: {})",
        config.database_url.is_some(),
        config.departements,
        config.max_fires,
        config.cartes_dir.display()
    );

    let app = Application::build(config).await?;
    app.run_until_stopped().await?;

    Ok(())
}
