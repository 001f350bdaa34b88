// QGIS2Web export tests against the sample bundle in tests/fixtures/cartes

mod common;

use paca_fire_service::export_error::ExportError;
use paca_fire_service::qgis2web::{interpret_styles, list_layers, StyleDescriptor, UNORDERED};
use paca_fire_service::services::ExportService;

use common::{fixture_cartes_dir, FIXTURE_EXPORT};

fn fixture_index() -> String {
    std::fs::read_to_string(fixture_cartes_dir().join(FIXTURE_EXPORT).join("index.html")).unwrap()
}

#[test]
fn test_interpret_fixture_styles() {
    let styles = interpret_styles(&fixture_index());
    assert_eq!(styles.len(), 3);

    let kinds: Vec<_> = styles.iter().map(|(id, s)| (id.as_str(), s.kind())).collect();
    assert_eq!(
        kinds,
        vec![
            ("Communes_1", "simple"),
            ("Incendies_3", "graduated"),
            ("Occupation_2", "categorical"),
        ]
    );
}

#[test]
fn test_categorical_fixture_style() {
    let styles = interpret_styles(&fixture_index());
    let Some(StyleDescriptor::Categorical(style)) = styles.get("Occupation_2") else {
        panic!("Expected categorical style");
    };
    assert_eq!(style.property, "type");
    assert_eq!(style.fill.values["Forêt"], "rgba(51,160,44,1.0)");
    assert_eq!(style.fill.default.as_deref(), Some("rgba(200,200,200,1.0)"));
    assert_eq!(style.paint.weight, Some(2.0));
    assert_eq!(style.paint.fill_opacity, Some(0.5));
}

#[test]
fn test_graduated_fixture_style() {
    let styles = interpret_styles(&fixture_index());
    let Some(StyleDescriptor::Graduated(style)) = styles.get("Incendies_3") else {
        panic!("Expected graduated style");
    };
    assert_eq!(style.property, "surf_ha");
    let bounds: Vec<_> = style.rules.iter().map(|r| (r.min, r.max)).collect();
    // The second rule was written "> 50 && <= 1"
    assert_eq!(bounds, vec![(0.0, 1.0), (1.0, 50.0), (50.0, 12000.0)]);
    assert!(style.rules.iter().all(|r| r.style.paint.fill_enabled == Some(true)));
}

#[test]
fn test_fixture_catalog_order() {
    let layers = list_layers(&fixture_cartes_dir().join(FIXTURE_EXPORT)).unwrap();

    let ids: Vec<_> = layers.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["Communes_1", "Occupation_2", "Incendies_3", "Casse_8", "Reperes_9"]
    );

    let names: Vec<_> = layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Communes", "Occupation", "Incendies", "Casse", "Reperes"]);

    assert!(layers[0].order < layers[1].order && layers[1].order < layers[2].order);
    assert_eq!(layers[3].order, UNORDERED);
    assert_eq!(layers[4].order, UNORDERED);
    assert!(layers[3].style.is_none());
}

#[test]
fn test_export_service_over_fixture() {
    let service = ExportService::new(fixture_cartes_dir());

    let list = service.list_exports().unwrap();
    assert_eq!(list.exports, vec![FIXTURE_EXPORT.to_string()]);
    assert_eq!(list.default.as_deref(), Some(FIXTURE_EXPORT));

    let response = service.layers(Some("latest")).unwrap();
    assert_eq!(response.export, FIXTURE_EXPORT);
    assert_eq!(response.layers.len(), 5);

    let layer = service.layer_geojson(None, "Communes_1").unwrap();
    assert_eq!(layer.geojson["type"], "FeatureCollection");
    assert_eq!(layer.geojson["features"].as_array().unwrap().len(), 2);
}

#[test]
fn test_export_service_errors() {
    let service = ExportService::new(fixture_cartes_dir());

    assert!(matches!(
        service.layer_geojson(None, "Casse_8"),
        Err(ExportError::InvalidLayerFormat(_))
    ));
    assert!(matches!(
        service.layer_geojson(None, "Absent_1"),
        Err(ExportError::LayerNotFound(_))
    ));
    assert!(matches!(
        service.layer_geojson(None, "../index"),
        Err(ExportError::InvalidLayerId(_))
    ));
    assert!(matches!(
        service.layers(Some("autre_dossier")),
        Ok(ref response) if response.layers.is_empty()
    ));
    assert!(matches!(
        service.layers(Some("qgis2web_absent")),
        Err(ExportError::ExportNotFound(_))
    ));
}
