// ! Fire sources that do not need a database: registry CSV exports and synthetic data

pub mod csv_importer;
pub mod synthetic;

// Re-export commonly used items
pub use csv_importer::{CsvImportError, FireCsvImporter, FireTable};
pub use synthetic::SyntheticFireGenerator;
