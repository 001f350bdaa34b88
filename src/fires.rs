// Fire registry records
//
// This module turns rows of the regional fire registry into canonical records:
// - columns: locale-tolerant header resolution
// - severity: burned area to alert tier
// - record: row normalization (dates, units, identifiers)
// - aggregate / stats: per-commune metrics and summary counts

pub mod aggregate;
pub mod columns;
pub mod record;
pub mod severity;
pub mod stats;

pub use aggregate::{InseeAggregator, InseeMetric, MetricFilters, Observation};
pub use columns::{normalize_key, HeaderIndex, ResolvedColumns};
pub use record::{FallbackIds, FireFacts, FireRecord, RawRow, RecordNormalizer};
pub use severity::Alerte;
pub use stats::FireStats;
