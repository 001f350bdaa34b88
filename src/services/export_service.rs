use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::export_error::ExportError;
use crate::qgis2web::catalog::{layers_dir, list_layers, LayerInfo};

const EXPORT_PREFIX: &str = "qgis2web_";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExportList {
    pub exports: Vec<String>,
    /// Most recently modified export
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LayerListResponse {
    pub export: String,
    pub layers: Vec<LayerInfo>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LayerGeoJson {
    pub export: String,
    pub id: String,
    /// Layer payload, passed through unchanged
    #[schema(value_type = Object)]
    pub geojson: serde_json::Value,
}

/// Discovery of QGIS2Web exports under the cartes directory
///
/// All methods are blocking filesystem reads.
#[derive(Debug, Clone)]
pub struct ExportService {
    cartes_dir: PathBuf,
}

impl ExportService {
    pub fn new(cartes_dir: impl Into<PathBuf>) -> Self {
        Self {
            cartes_dir: cartes_dir.into(),
        }
    }

    pub fn cartes_dir(&self) -> &Path {
        &self.cartes_dir
    }

    /// Export directories with their modification time, sorted by name
    fn discover(&self) -> Result<Vec<(String, SystemTime)>, ExportError> {
        if !self.cartes_dir.is_dir() {
            debug!("Cartes directory {} does not exist", self.cartes_dir.display());
            return Ok(Vec::new());
        }

        let mut exports = Vec::new();
        for entry in std::fs::read_dir(&self.cartes_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !name.to_ascii_lowercase().starts_with(EXPORT_PREFIX) {
                continue;
            }
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            exports.push((name, modified));
        }

        exports.sort();
        Ok(exports)
    }

    #[instrument(skip(self))]
    pub fn list_exports(&self) -> Result<ExportList, ExportError> {
        let exports = self.discover()?;
        // Ties resolve to the greatest name; export names embed their timestamp
        let default = exports
            .iter()
            .max_by_key(|(_, modified)| *modified)
            .map(|(name, _)| name.clone());

        debug!("Found {} exports, default {:?}", exports.len(), default);
        Ok(ExportList {
            exports: exports.into_iter().map(|(name, _)| name).collect(),
            default,
        })
    }

    /// Export directory for a requested name
    ///
    /// Empty, `latest` and `default` select the most recent export.
    pub fn resolve(&self, export: Option<&str>) -> Result<(String, PathBuf), ExportError> {
        let requested = export.map(str::trim).unwrap_or_default();

        if requested.is_empty()
            || requested.eq_ignore_ascii_case("latest")
            || requested.eq_ignore_ascii_case("default")
        {
            let name = self.list_exports()?.default.ok_or_else(|| {
                ExportError::ExportNotFound("No QGIS2Web export found".to_string())
            })?;
            let dir = self.cartes_dir.join(&name);
            return Ok((name, dir));
        }

        if requested == "."
            || requested.contains("..")
            || requested.contains('/')
            || requested.contains('\\')
        {
            warn!("Rejected export name {:?}", requested);
            return Err(ExportError::InvalidExportName(requested.to_string()));
        }

        let dir = self.cartes_dir.join(requested);
        if !dir.is_dir() {
            return Err(ExportError::ExportNotFound(requested.to_string()));
        }
        Ok((requested.to_string(), dir))
    }

    /// Export directory and checked relative path of a static file in it
    ///
    /// The path is validated before the export is resolved, and must name a
    /// regular file.
    #[instrument(skip(self))]
    pub fn asset(&self, export: &str, asset_path: &str) -> Result<(PathBuf, String), ExportError> {
        validate_asset_path(asset_path)?;
        let (export, dir) = self.resolve(Some(export))?;

        if !dir.join(asset_path).is_file() {
            return Err(ExportError::AssetNotFound(format!("{export}/{asset_path}")));
        }
        debug!("Serving {} from {}", asset_path, export);
        Ok((dir, asset_path.to_string()))
    }

    #[instrument(skip(self))]
    pub fn layers(&self, export: Option<&str>) -> Result<LayerListResponse, ExportError> {
        let (export, dir) = self.resolve(export)?;
        let layers = list_layers(&dir)?;
        info!("Listed {} layers of export {}", layers.len(), export);
        Ok(LayerListResponse { export, layers })
    }

    /// GeoJSON payload of one layer file (`var json_X = {...};`)
    #[instrument(skip(self))]
    pub fn layer_geojson(
        &self,
        export: Option<&str>,
        layer_id: &str,
    ) -> Result<LayerGeoJson, ExportError> {
        validate_layer_id(layer_id)?;
        let (export, dir) = self.resolve(export)?;

        let path = layers_dir(&dir).join(format!("{layer_id}.js"));
        if !path.is_file() {
            return Err(ExportError::LayerNotFound(layer_id.to_string()));
        }

        let bytes = std::fs::read(&path)?;
        let geojson = extract_json(&String::from_utf8_lossy(&bytes))?;
        debug!("Loaded layer {} ({} bytes)", layer_id, bytes.len());

        Ok(LayerGeoJson {
            export,
            id: layer_id.to_string(),
            geojson,
        })
    }
}

/// Asset paths are relative, `/`-separated and stay inside the export
pub fn validate_asset_path(asset_path: &str) -> Result<(), ExportError> {
    let valid = !asset_path.is_empty()
        && !asset_path.contains(['\\', ':', '\0'])
        && asset_path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        warn!("Rejected asset path {:?}", asset_path);
        Err(ExportError::InvalidAssetPath(asset_path.to_string()))
    }
}

/// Layer ids name a file directly under `data/`
pub fn validate_layer_id(layer_id: &str) -> Result<(), ExportError> {
    let valid = !layer_id.is_empty()
        && layer_id != "."
        && layer_id != ".."
        && layer_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        warn!("Rejected layer id {:?}", layer_id);
        Err(ExportError::InvalidLayerId(layer_id.to_string()))
    }
}

/// The JSON between the first `{` and the last `}` of a layer script
pub fn extract_json(text: &str) -> Result<serde_json::Value, ExportError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ExportError::InvalidLayerFormat(
            "no JSON object in layer file".to_string(),
        ));
    };
    if end <= start {
        return Err(ExportError::InvalidLayerFormat(
            "no JSON object in layer file".to_string(),
        ));
    }

    serde_json::from_str(&text[start..=end])
        .map_err(|e| ExportError::InvalidLayerFormat(format!("Failed to parse GeoJSON: {e}")))
}
