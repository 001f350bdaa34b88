use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use tracing::debug;

use crate::fires::record::FireRecord;
use crate::fires::severity::Alerte;
use crate::utils::round2;

const COMMUNES: [&str; 10] = [
    "Marseille",
    "Aix-en-Provence",
    "Toulon",
    "Nice",
    "Cannes",
    "Antibes",
    "Avignon",
    "Arles",
    "Hyères",
    "La Seyne-sur-Mer",
];

const CAUSES: [&str; 5] = ["Imprudence", "Foudre", "Travaux", "Pyromanie", "Inconnue"];

// Rough PACA bounding box
const LAT_RANGE: (f64, f64) = (43.0, 44.8);
const LON_RANGE: (f64, f64) = (4.7, 7.7);

/// Generates plausible fires when neither a database nor a CSV export is available
#[derive(Debug, Clone)]
pub struct SyntheticFireGenerator {
    count: usize,
    seed: Option<u64>,
}

impl SyntheticFireGenerator {
    /// `seed` makes the output reproducible for a given `now`
    pub fn new(count: usize, seed: Option<u64>) -> Self {
        Self { count, seed }
    }

    pub fn generate(&self, now: DateTime<Utc>) -> Vec<FireRecord> {
        // Use seed if provided for reproducible output, otherwise use entropy
        let mut rng = if let Some(seed) = self.seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        let mut fires: Vec<FireRecord> = (1..=self.count)
            .map(|i| {
                let days_ago = rng.gen_range(1..=30);
                let commune = COMMUNES[rng.gen_range(0..COMMUNES.len())];
                let latitude = round6(rng.gen_range(LAT_RANGE.0..=LAT_RANGE.1));
                let longitude = round6(rng.gen_range(LON_RANGE.0..=LON_RANGE.1));
                let surface_ha = round2(rng.gen_range(1.0..=100.0));
                let cause = CAUSES[rng.gen_range(0..CAUSES.len())];

                FireRecord {
                    id: i as i64,
                    commune: commune.to_string(),
                    latitude: Some(latitude),
                    longitude: Some(longitude),
                    surface_ha: Some(surface_ha),
                    alerte: Alerte::from_surface(Some(surface_ha)),
                    cause: cause.to_string(),
                    date: now - Duration::days(days_ago),
                    departement: None,
                    insee: None,
                }
            })
            .collect();

        // Oldest first for a stable presentation
        fires.sort_by(|a, b| a.date.cmp(&b.date));
        debug!("Generated {} synthetic fires (seeded: {})", fires.len(), self.seed.is_some());
        fires
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
