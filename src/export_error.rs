#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Export not found: {0}")]
    ExportNotFound(String),
    #[error("Invalid export name: {0}")]
    InvalidExportName(String),
    #[error("Layer not found: {0}")]
    LayerNotFound(String),
    #[error("Invalid layer id: {0}")]
    InvalidLayerId(String),
    #[error("Invalid layer file format: {0}")]
    InvalidLayerFormat(String),
    #[error("Asset not found: {0}")]
    AssetNotFound(String),
    #[error("Invalid asset path: {0}")]
    InvalidAssetPath(String),
    #[error("Failed to read export: {0}")]
    Io(#[from] std::io::Error),
}
