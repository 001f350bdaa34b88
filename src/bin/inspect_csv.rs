use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use paca_fire_service::config::{parse_departements, DEFAULT_DEPARTEMENTS};
use paca_fire_service::importers::FireCsvImporter;

#[derive(Parser)]
#[command(name = "inspect-csv")]
#[command(about = "Show how a fire registry CSV export is resolved and normalized", long_about = None)]
struct Cli {
    /// CSV export to inspect
    #[arg(long, env = "FIRE_CSV_PATH", default_value = "data/liste_incendies_all.csv")]
    path: PathBuf,

    /// Comma-separated department allow-list
    #[arg(long, env, default_value = DEFAULT_DEPARTEMENTS)]
    departements: String,

    /// Number of normalized records to print
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let importer = FireCsvImporter::new(&cli.path);
    let table = importer.read_table()?;
    let columns = table.columns();

    println!("File: {}", cli.path.display());
    println!("Rows: {}", table.rows.len());
    println!("\nResolved columns:");
    for (logical, header) in [
        ("annee", &columns.annee),
        ("numero", &columns.numero),
        ("departement", &columns.departement),
        ("insee", &columns.insee),
        ("commune", &columns.commune),
        ("date_alerte", &columns.date_alerte),
        ("origine", &columns.origine),
        ("surface_ha", &columns.surface_ha),
        ("surface_m2", &columns.surface_m2),
    ] {
        println!("  {:<12} -> {}", logical, header.as_deref().unwrap_or("(not found)"));
    }

    let allowed = parse_departements(&cli.departements);
    let fires = table.normalize(&allowed, cli.limit, Utc::now());
    println!("\nFirst {} records (newest first):", fires.len());
    for fire in &fires {
        println!("{}", serde_json::to_string(fire)?);
    }

    Ok(())
}
