use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::warn;

use crate::fires::{Alerte, FireRecord};
use crate::utils::round2;

// Database entity models
#[derive(Debug, Clone, FromRow)]
pub struct FireRow {
    pub id: i64,
    pub commune: String,
    pub surface_ha: Option<f64>,
    pub alerte: String,
    pub cause: String,
    pub date_alerte: Option<DateTime<Utc>>,
    pub departement: Option<String>,
    pub insee: Option<String>,
}

impl FireRow {
    /// A missing alert date falls back to `now`, like the CSV path
    pub fn into_record(self, now: DateTime<Utc>) -> FireRecord {
        let alerte = self.alerte.parse::<Alerte>().unwrap_or_else(|e| {
            warn!("{}; reclassifying fire {} from its area", e, self.id);
            Alerte::from_surface(self.surface_ha)
        });

        FireRecord {
            id: self.id,
            commune: self.commune,
            latitude: None,
            longitude: None,
            surface_ha: self.surface_ha.map(round2),
            alerte,
            cause: self.cause,
            date: self.date_alerte.unwrap_or(now),
            departement: self.departement,
            insee: self.insee,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InseeMetricRow {
    pub insee: String,
    pub fires: i64,
    pub surface_ha: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct KeyCountRow {
    pub key: String,
    pub n: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct TotalsRow {
    pub n: i64,
    pub s: f64,
}
