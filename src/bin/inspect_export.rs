use clap::Parser;
use std::path::PathBuf;

use paca_fire_service::qgis2web::{list_layers, StyleDescriptor};
use paca_fire_service::services::ExportService;

#[derive(Parser)]
#[command(name = "inspect-export")]
#[command(about = "Print the layer catalog and interpreted styles of a QGIS2Web export", long_about = None)]
struct Cli {
    /// Export directory name under the cartes directory (defaults to the latest)
    export: Option<String>,

    /// Directory holding qgis2web_* exports
    #[arg(long, env, default_value = "data/cartes")]
    cartes_dir: PathBuf,

    /// Print every style as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let service = ExportService::new(&cli.cartes_dir);
    let list = service.list_exports()?;
    println!("Exports in {}:", cli.cartes_dir.display());
    for name in &list.exports {
        let marker = if list.default.as_ref() == Some(name) { " (default)" } else { "" };
        println!("  {name}{marker}");
    }

    let (export, dir) = service.resolve(cli.export.as_deref())?;
    let layers = list_layers(&dir)?;
    println!("\nExport {export}: {} layers", layers.len());
    println!("{}", "=".repeat(80));

    for layer in &layers {
        let kind = layer.style.as_ref().map(StyleDescriptor::kind).unwrap_or("-");
        println!(
            "{:>12}  {:<32} {:<12} {}",
            layer.order, layer.name, kind, layer.filename
        );

        match &layer.style {
            Some(StyleDescriptor::Categorical(style)) => {
                println!("              property {}", style.property);
                for (value, color) in &style.fill.values {
                    println!("              {value} -> {color}");
                }
            }
            Some(StyleDescriptor::Graduated(style)) => {
                for rule in &style.rules {
                    println!(
                        "              [{}, {}] fill {}",
                        rule.min,
                        rule.max,
                        rule.style.fill.as_deref().unwrap_or("-")
                    );
                }
            }
            _ => {}
        }

        if cli.json {
            if let Some(style) = &layer.style {
                println!("{}", serde_json::to_string_pretty(style)?);
            }
        }
    }

    Ok(())
}
