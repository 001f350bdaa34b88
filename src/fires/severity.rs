use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Alert tier derived from burned area
///
/// Ordering follows severity, with `Unknown` (no area) below every tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum Alerte {
    #[serde(rename = "?")]
    Unknown,
    Jaune,
    Orange,
    Rouge,
    Noir,
}

impl Alerte {
    /// Lower bounds (hectares) of the Orange, Rouge and Noir tiers
    pub const ORANGE_HA: f64 = 1.0;
    pub const ROUGE_HA: f64 = 10.0;
    pub const NOIR_HA: f64 = 50.0;

    /// Classify a burned area; bounds are inclusive on the lower side
    pub fn from_surface(surface_ha: Option<f64>) -> Self {
        match surface_ha {
            None => Alerte::Unknown,
            Some(ha) if ha < Self::ORANGE_HA => Alerte::Jaune,
            Some(ha) if ha < Self::ROUGE_HA => Alerte::Orange,
            Some(ha) if ha < Self::NOIR_HA => Alerte::Rouge,
            Some(_) => Alerte::Noir,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alerte::Unknown => "?",
            Alerte::Jaune => "Jaune",
            Alerte::Orange => "Orange",
            Alerte::Rouge => "Rouge",
            Alerte::Noir => "Noir",
        }
    }

    /// SQL expression reproducing `from_surface` over a nullable column
    pub fn sql_case(column: &str) -> String {
        format!(
            "CASE WHEN {c} IS NULL THEN '?' \
             WHEN {c} < {o} THEN 'Jaune' \
             WHEN {c} < {r} THEN 'Orange' \
             WHEN {c} < {n} THEN 'Rouge' \
             ELSE 'Noir' END",
            c = column,
            o = Self::ORANGE_HA,
            r = Self::ROUGE_HA,
            n = Self::NOIR_HA,
        )
    }
}

impl fmt::Display for Alerte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown alert tier: {0}")]
pub struct UnknownAlerte(pub String);

impl FromStr for Alerte {
    type Err = UnknownAlerte;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "?" => Ok(Alerte::Unknown),
            "Jaune" => Ok(Alerte::Jaune),
            "Orange" => Ok(Alerte::Orange),
            "Rouge" => Ok(Alerte::Rouge),
            "Noir" => Ok(Alerte::Noir),
            other => Err(UnknownAlerte(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_area_is_unknown() {
        assert_eq!(Alerte::from_surface(None), Alerte::Unknown);
        assert_eq!(Alerte::from_surface(None).as_str(), "?");
    }

    #[test]
    fn test_exact_boundaries() {
        assert_eq!(Alerte::from_surface(Some(0.0)), Alerte::Jaune);
        assert_eq!(Alerte::from_surface(Some(0.99)), Alerte::Jaune);
        assert_eq!(Alerte::from_surface(Some(1.0)), Alerte::Orange);
        assert_eq!(Alerte::from_surface(Some(9.99)), Alerte::Orange);
        assert_eq!(Alerte::from_surface(Some(10.0)), Alerte::Rouge);
        assert_eq!(Alerte::from_surface(Some(49.99)), Alerte::Rouge);
        assert_eq!(Alerte::from_surface(Some(50.0)), Alerte::Noir);
        assert_eq!(Alerte::from_surface(Some(12_000.0)), Alerte::Noir);
    }

    #[test]
    fn test_monotonic_in_area() {
        let mut previous = Alerte::from_surface(Some(0.0));
        for step in 0..=12_000 {
            let area = step as f64 * 0.01;
            let current = Alerte::from_surface(Some(area));
            assert!(current >= previous, "tier decreased at {area} ha");
            previous = current;
        }
    }

    #[test]
    fn test_round_trip_labels() {
        for tier in [
            Alerte::Unknown,
            Alerte::Jaune,
            Alerte::Orange,
            Alerte::Rouge,
            Alerte::Noir,
        ] {
            assert_eq!(tier.as_str().parse::<Alerte>().unwrap(), tier);
        }
        assert!("rouge".parse::<Alerte>().is_err());
    }

    #[test]
    fn test_serializes_as_label() {
        assert_eq!(serde_json::to_value(Alerte::Unknown).unwrap(), "?");
        assert_eq!(serde_json::to_value(Alerte::Noir).unwrap(), "Noir");
    }

    #[test]
    fn test_sql_case_uses_same_boundaries() {
        let sql = Alerte::sql_case("surface_ha");
        assert!(sql.starts_with("CASE WHEN surface_ha IS NULL THEN '?'"));
        assert!(sql.contains("WHEN surface_ha < 1 THEN 'Jaune'"));
        assert!(sql.contains("WHEN surface_ha < 10 THEN 'Orange'"));
        assert!(sql.contains("WHEN surface_ha < 50 THEN 'Rouge'"));
        assert!(sql.ends_with("ELSE 'Noir' END"));
    }
}
