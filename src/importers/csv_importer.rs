use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::fires::aggregate::{InseeAggregator, InseeMetric, MetricFilters};
use crate::fires::columns::ResolvedColumns;
use crate::fires::record::{FallbackIds, FireRecord, RawRow, RecordNormalizer};

#[derive(Error, Debug)]
pub enum CsvImportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Decoded registry export: literal headers plus one map per data row
#[derive(Debug, Clone, Default)]
pub struct FireTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl FireTable {
    /// Decode a semicolon-delimited export in its legacy single-byte encoding
    ///
    /// A UTF-8 byte-order mark, when present, takes precedence over windows-1252.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CsvImportError> {
        let (text, encoding, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
        if had_errors {
            warn!("Replacement characters inserted while decoding as {}", encoding.name());
        }
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self, CsvImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Ok(Self::default());
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // Short rows leave trailing columns absent, long rows drop extras
            let row: RawRow = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect();
            rows.push(row);
        }

        debug!("Decoded {} rows across {} columns", rows.len(), headers.len());
        Ok(Self { headers, rows })
    }

    pub fn columns(&self) -> ResolvedColumns {
        ResolvedColumns::from_headers(&self.headers)
    }

    /// Normalize every allow-listed row, newest first, truncated to `max_records`
    pub fn normalize(
        &self,
        allowed: &[String],
        max_records: usize,
        now: DateTime<Utc>,
    ) -> Vec<FireRecord> {
        let columns = self.columns();
        let normalizer = RecordNormalizer::new(&columns, allowed, now);
        let mut ids = FallbackIds::new();

        let mut fires: Vec<FireRecord> = self
            .rows
            .iter()
            .filter_map(|row| normalizer.normalize(row, &mut ids))
            .collect();

        let skipped = self.rows.len() - fires.len();
        if skipped > 0 {
            debug!("Skipped {} rows outside the department allow-list", skipped);
        }

        fires.sort_by(|a, b| b.date.cmp(&a.date));
        fires.truncate(max_records);
        fires
    }

    /// Per-INSEE metrics straight from the rows (unrounded areas)
    pub fn metrics_by_insee(
        &self,
        allowed: &[String],
        filters: &MetricFilters,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, InseeMetric> {
        let columns = self.columns();
        let normalizer = RecordNormalizer::new(&columns, allowed, now);
        let facts: Vec<_> = self.rows.iter().map(|row| normalizer.facts(row)).collect();

        InseeAggregator::new(allowed, filters).aggregate(&facts)
    }
}

/// Reads the regional fire registry from a CSV export on disk
///
/// All methods are blocking; async callers should use `spawn_blocking()`.
#[derive(Debug, Clone)]
pub struct FireCsvImporter {
    path: PathBuf,
}

impl FireCsvImporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_table(&self) -> Result<FireTable, CsvImportError> {
        let bytes = std::fs::read(&self.path).map_err(|source| CsvImportError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        debug!("Read {} bytes", bytes.len());

        FireTable::from_bytes(&bytes)
    }

    pub fn import_fires(
        &self,
        allowed: &[String],
        max_records: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<FireRecord>, CsvImportError> {
        let table = self.read_table()?;
        let fires = table.normalize(allowed, max_records, now);
        info!(
            "Imported {} fires from {} ({} rows)",
            fires.len(),
            self.path.display(),
            table.rows.len()
        );
        Ok(fires)
    }

    pub fn metrics_by_insee(
        &self,
        allowed: &[String],
        filters: &MetricFilters,
        now: DateTime<Utc>,
    ) -> Result<BTreeMap<String, InseeMetric>, CsvImportError> {
        let table = self.read_table()?;
        let metrics = table.metrics_by_insee(allowed, filters, now);
        info!(
            "Aggregated {} communes from {}",
            metrics.len(),
            self.path.display()
        );
        Ok(metrics)
    }
}
