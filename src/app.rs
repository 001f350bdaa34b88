use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::{connect_lazy, FireRepository};
use crate::services::{ExportService, FireService};

/// Running HTTP server
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
}

impl Application {
    /// Build the router from the configuration and spawn the server
    ///
    /// With `DATABASE_URL` set the pool is created lazily, so an unreachable
    /// database surfaces per request rather than at startup.
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let app = Self::router(&config)?;

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

        info!("Application initialized successfully");
        Ok(Self { server_handle })
    }

    /// Router with services wired from the configuration
    pub fn router(config: &Config) -> Result<axum::Router, Box<dyn std::error::Error>> {
        let fire_repo = match &config.database_url {
            Some(url) => {
                info!("Fire data source: postgres");
                Some(FireRepository::new(connect_lazy(url)?))
            }
            None => {
                if config.fire_csv_path.exists() {
                    info!("Fire data source: csv ({})", config.fire_csv_path.display());
                } else {
                    warn!(
                        "{} not found and no DATABASE_URL; serving synthetic fires",
                        config.fire_csv_path.display()
                    );
                }
                None
            }
        };

        let fire_service = FireService::new(config.clone(), fire_repo);
        let export_service = ExportService::new(config.cartes_dir.clone());

        let app_state = AppState {
            fire_service,
            export_service,
        };
        Ok(create_router(app_state).layer(TraceLayer::new_for_http()))
    }

    /// Run until the server stops
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
