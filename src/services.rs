pub mod export_service;
pub mod fire_service;

pub use export_service::{ExportList, ExportService, LayerGeoJson, LayerListResponse};
pub use fire_service::{FireService, FireServiceError, FireSource, InseeMetricsResponse};
