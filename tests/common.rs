#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use paca_fire_service::config::Config;
use tempfile::NamedTempFile;

/// Registry export in its legacy encoding: `é` is the single byte 0xE9
pub const REGISTRY_CSV: &[u8] = b"Ann\xe9e;Num\xe9ro;D\xe9partement;Code INSEE;Commune;Alerte;Origine de l'alerte;surf_ha;Surface parcourue (m2)\n\
1973;4521;13;13055;Marseille;09/01/1973 13:50;Vigie-camera;25,5;255000\n\
1990;;83;83137;Vidauban;12/08/1990 16:05;;;50000\n\
1990;abc;83;83137;Vidauban;garbage;Patrouille;0,4;\n\
2003;;83;83148;Le Luc;;Particulier;120;\n\
2003;9001;2B;2B096;Corte;13/08/2003 10:00;;3;\n\
2019;9002;06;;Nice;15/07/2019 14:20;;12;\n";

/// Write `contents` to a scratch file that lives as long as the handle
pub fn write_temp_csv(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp CSV");
    file.write_all(contents).expect("Failed to write temp CSV");
    file.flush().expect("Failed to flush temp CSV");
    file
}

/// Directory holding the sample QGIS2Web export
pub fn fixture_cartes_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cartes")
}

pub const FIXTURE_EXPORT: &str = "qgis2web_2025_06_01-10_00_00";

/// Configuration without a database, pointing at the given CSV and the fixture exports
pub fn test_config(csv_path: PathBuf) -> Config {
    Config {
        database_url: None,
        fire_csv_path: csv_path,
        cartes_dir: fixture_cartes_dir(),
        fire_count: 8,
        seed: Some(7),
        ..Config::default()
    }
}
