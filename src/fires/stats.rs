use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::fires::record::FireRecord;
use crate::utils::round2;

/// Dashboard summary: totals plus counts per alert tier and per commune
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FireStats {
    pub count: u64,
    pub total_surface_ha: f64,
    pub by_alerte: BTreeMap<String, u64>,
    pub by_commune: BTreeMap<String, u64>,
    pub generated_at: DateTime<Utc>,
    pub source: String,
}

impl FireStats {
    /// Summarize already-normalized records (null area counts as zero)
    pub fn from_records(
        records: &[FireRecord],
        source: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut by_alerte = BTreeMap::new();
        let mut by_commune = BTreeMap::new();
        let mut total_surface = 0.0;

        for record in records {
            total_surface += record.surface_ha.unwrap_or(0.0);
            *by_alerte.entry(record.alerte.to_string()).or_insert(0) += 1;
            let commune = if record.commune.is_empty() {
                "?".to_string()
            } else {
                record.commune.clone()
            };
            *by_commune.entry(commune).or_insert(0) += 1;
        }

        Self {
            count: records.len() as u64,
            total_surface_ha: round2(total_surface),
            by_alerte,
            by_commune,
            generated_at,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fires::Alerte;
    use chrono::TimeZone;

    fn record(id: i64, commune: &str, surface: Option<f64>) -> FireRecord {
        FireRecord {
            id,
            commune: commune.to_string(),
            latitude: None,
            longitude: None,
            surface_ha: surface,
            alerte: Alerte::from_surface(surface),
            cause: "Inconnue".to_string(),
            date: Utc.with_ymd_and_hms(2003, 7, 17, 15, 0, 0).unwrap(),
            departement: Some("83".to_string()),
            insee: None,
        }
    }

    #[test]
    fn test_from_records() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let records = vec![
            record(1, "Vidauban", Some(1.25)),
            record(2, "Vidauban", Some(60.0)),
            record(3, "Le Luc", None),
        ];

        let stats = FireStats::from_records(&records, "csv", now);

        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_surface_ha, 61.25);
        assert_eq!(stats.by_alerte["Orange"], 1);
        assert_eq!(stats.by_alerte["Noir"], 1);
        assert_eq!(stats.by_alerte["?"], 1);
        assert_eq!(stats.by_commune["Vidauban"], 2);
        assert_eq!(stats.source, "csv");
    }

    #[test]
    fn test_empty_records() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let stats = FireStats::from_records(&[], "synthetic", now);

        assert_eq!(stats.count, 0);
        assert_eq!(stats.total_surface_ha, 0.0);
        assert!(stats.by_alerte.is_empty());
    }
}
