use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::config::Config;
use crate::db::{DbError, FireRepository};
use crate::fires::{FireRecord, FireStats, InseeMetric, MetricFilters};
use crate::importers::{CsvImportError, FireCsvImporter, SyntheticFireGenerator};

#[derive(Error, Debug)]
pub enum FireServiceError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("CSV import error: {0}")]
    Csv(#[from] CsvImportError),

    #[error("{0}")]
    SourceUnavailable(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Per-commune metrics together with the provider and filters that produced them
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InseeMetricsResponse {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub filters: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, InseeMetric>,
}

/// The single provider serving a request
///
/// Once selected there is no fallback: a database failure is returned as is.
#[derive(Clone)]
pub enum FireSource {
    Postgres(FireRepository),
    Csv(FireCsvImporter),
    Synthetic(SyntheticFireGenerator),
}

impl FireSource {
    pub fn name(&self) -> &'static str {
        match self {
            FireSource::Postgres(_) => "postgres",
            FireSource::Csv(_) => "csv",
            FireSource::Synthetic(_) => "synthetic",
        }
    }

    pub async fn list_fires(
        &self,
        allowed: &[String],
        max_records: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<FireRecord>, FireServiceError> {
        match self {
            FireSource::Postgres(repo) => {
                let limit = i64::try_from(max_records).unwrap_or(i64::MAX);
                Ok(repo.find_recent(allowed, limit, now).await?)
            }
            FireSource::Csv(importer) => {
                let importer = importer.clone();
                let allowed = allowed.to_vec();
                let fires = tokio::task::spawn_blocking(move || {
                    importer.import_fires(&allowed, max_records, now)
                })
                .await??;
                Ok(fires)
            }
            FireSource::Synthetic(generator) => Ok(generator.generate(now)),
        }
    }

    pub async fn metrics_by_insee(
        &self,
        allowed: &[String],
        filters: &MetricFilters,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<String, InseeMetric>, FireServiceError> {
        match self {
            FireSource::Postgres(repo) => Ok(repo.metrics_by_insee(allowed, filters).await?),
            FireSource::Csv(importer) => {
                let importer = importer.clone();
                let allowed = allowed.to_vec();
                let filters = filters.clone();
                let metrics = tokio::task::spawn_blocking(move || {
                    importer.metrics_by_insee(&allowed, &filters, now)
                })
                .await??;
                Ok(metrics)
            }
            FireSource::Synthetic(_) => Err(FireServiceError::SourceUnavailable(
                "No fire registry available: set DATABASE_URL or provide FIRE_CSV_PATH".to_string(),
            )),
        }
    }

    pub async fn stats(
        &self,
        allowed: &[String],
        max_records: usize,
        now: DateTime<Utc>,
    ) -> Result<FireStats, FireServiceError> {
        match self {
            FireSource::Postgres(repo) => Ok(repo.stats(allowed, now).await?),
            _ => {
                let fires = self.list_fires(allowed, max_records, now).await?;
                Ok(FireStats::from_records(&fires, self.name(), now))
            }
        }
    }
}

/// Fire data for the API, from whichever provider the configuration selects
#[derive(Clone)]
pub struct FireService {
    config: Config,
    fire_repo: Option<FireRepository>,
}

impl FireService {
    /// `fire_repo` is present exactly when a database URL is configured
    pub fn new(config: Config, fire_repo: Option<FireRepository>) -> Self {
        Self { config, fire_repo }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Database if configured, else the CSV file if it exists, else synthetic data
    pub fn select_source(&self) -> FireSource {
        if let Some(repo) = &self.fire_repo {
            return FireSource::Postgres(repo.clone());
        }

        let importer = FireCsvImporter::new(self.config.fire_csv_path.clone());
        if importer.exists() {
            return FireSource::Csv(importer);
        }

        FireSource::Synthetic(SyntheticFireGenerator::new(
            self.config.fire_count,
            self.config.seed,
        ))
    }

    #[instrument(skip(self))]
    pub async fn list_fires(&self) -> Result<(Vec<FireRecord>, &'static str), FireServiceError> {
        let source = self.select_source();
        debug!("Listing fires from {}", source.name());

        let fires = source
            .list_fires(&self.config.departements, self.config.max_fires, Utc::now())
            .await?;
        info!("Listed {} fires from {}", fires.len(), source.name());
        Ok((fires, source.name()))
    }

    #[instrument(skip(self))]
    pub async fn metrics_by_insee(
        &self,
        filters: &MetricFilters,
    ) -> Result<InseeMetricsResponse, FireServiceError> {
        let source = self.select_source();
        let now = Utc::now();
        debug!("Aggregating metrics from {}", source.name());

        let metrics = source
            .metrics_by_insee(&self.config.departements, filters, now)
            .await?;
        info!("Aggregated {} communes from {}", metrics.len(), source.name());

        Ok(InseeMetricsResponse {
            generated_at: now,
            source: source.name().to_string(),
            filters: filters.applied(),
            metrics,
        })
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<FireStats, FireServiceError> {
        let source = self.select_source();
        let stats = source
            .stats(&self.config.departements, self.config.max_fires, Utc::now())
            .await?;
        info!("Computed stats over {} fires from {}", stats.count, source.name());
        Ok(stats)
    }
}
