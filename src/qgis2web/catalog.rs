use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

use crate::export_error::ExportError;
use crate::qgis2web::interpreter::{interpret_styles, StyleMap};
use crate::qgis2web::style::StyleDescriptor;

/// Order given to layers never referenced by the entry document
pub const UNORDERED: i64 = 1_000_000_000;

static NUMBERED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)_[0-9]+$").expect("valid layer suffix regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LayerInfo {
    pub id: String,
    pub name: String,
    pub filename: String,
    /// Always `geojson`
    pub kind: String,
    /// Interpreted rendering rule, tagged by `kind` (simple, categorical, graduated)
    #[schema(value_type = Object, nullable)]
    pub style: Option<StyleDescriptor>,
    pub order: i64,
}

/// `Communes_3` -> `Communes`; ids without a numeric suffix are kept as is
pub fn display_name(layer_id: &str) -> String {
    NUMBERED_SUFFIX
        .captures(layer_id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| layer_id.to_string())
}

/// Character offset of the first `layer_<id>` or `json_<id>` reference in the entry document
pub fn order_key(index_html: &str, layer_id: &str) -> i64 {
    [format!("layer_{layer_id}"), format!("json_{layer_id}")]
        .iter()
        .filter_map(|needle| index_html.find(needle.as_str()))
        .min()
        .map(|offset| index_html[..offset].chars().count() as i64)
        .unwrap_or(UNORDERED)
}

/// Build the ordered catalog from the entry document text and the data file names
pub fn build_catalog<I, S>(index_html: &str, file_names: I) -> Vec<LayerInfo>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let styles: StyleMap = interpret_styles(index_html);

    let mut layers: Vec<LayerInfo> = file_names
        .into_iter()
        .filter_map(|file_name| {
            let file_name = file_name.as_ref();
            let id = layer_id_from_file(file_name)?;
            Some(LayerInfo {
                name: display_name(&id),
                filename: file_name.to_string(),
                kind: "geojson".to_string(),
                style: styles.get(&id).cloned(),
                order: order_key(index_html, &id),
                id,
            })
        })
        .collect();

    layers.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    layers
}

/// Stem of a `.js` data file (extension matched case-insensitively)
fn layer_id_from_file(file_name: &str) -> Option<String> {
    let path = Path::new(file_name);
    let is_js = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("js"));
    if !is_js {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

pub fn layers_dir(export_dir: &Path) -> PathBuf {
    export_dir.join("data")
}

/// Entry document text, decoded lossily; a missing or unreadable file reads as empty
pub fn read_index(export_dir: &Path) -> String {
    let path = export_dir.join("index.html");
    match std::fs::read(&path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            debug!("No readable entry document at {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// Catalog of the layers of one export bundle
#[instrument(skip(export_dir), fields(export_dir = %export_dir.display()))]
pub fn list_layers(export_dir: &Path) -> Result<Vec<LayerInfo>, ExportError> {
    let data_dir = layers_dir(export_dir);
    if !data_dir.is_dir() {
        warn!("Export has no data directory");
        return Ok(Vec::new());
    }

    let mut file_names = Vec::new();
    for entry in std::fs::read_dir(&data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => file_names.push(name),
            Err(name) => warn!("Skipping non UTF-8 file name {:?}", name),
        }
    }
    file_names.sort();

    let index_html = read_index(export_dir);
    let layers = build_catalog(&index_html, &file_names);
    debug!("Found {} layers", layers.len());
    Ok(layers)
}
