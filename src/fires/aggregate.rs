use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

use crate::fires::record::{departement_allowed, FireFacts, FireRecord};
use crate::fires::severity::Alerte;
use crate::utils::{parse_decimal, round2};

/// Query filters for per-commune metrics, as supplied by the caller
///
/// Empty values and the literal `all` disable a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MetricFilters {
    /// Department code, or `all`
    pub departement: Option<String>,
    /// Alert tier label (`?`, `Jaune`, `Orange`, `Rouge`, `Noir`), or `all`
    pub alerte: Option<String>,
    /// Alert year, or `all`
    pub year: Option<String>,
    /// Minimum burned area in hectares; comma decimal separator accepted
    pub min_surface: Option<String>,
}

impl MetricFilters {
    fn active(value: &Option<String>) -> Option<&str> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "all")
    }

    pub fn departement(&self) -> Option<&str> {
        Self::active(&self.departement)
    }

    pub fn alerte(&self) -> Option<&str> {
        Self::active(&self.alerte)
    }

    pub fn year(&self) -> Option<&str> {
        Self::active(&self.year)
    }

    /// Minimum area; an unparsable value is ignored rather than rejected
    pub fn min_surface(&self) -> Option<f64> {
        self.min_surface.as_deref().and_then(parse_decimal)
    }

    /// The supplied, non-empty filters echoed verbatim
    pub fn applied(&self) -> BTreeMap<String, String> {
        [
            ("departement", &self.departement),
            ("alerte", &self.alerte),
            ("year", &self.year),
            ("min_surface", &self.min_surface),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| (key.to_string(), v.clone()))
        })
        .collect()
    }
}

/// Per-commune aggregate as emitted to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InseeMetric {
    pub fires: u64,
    pub surface_ha: f64,
}

/// What the aggregator needs to know about one fire
pub trait Observation {
    fn departement(&self) -> Option<&str>;
    fn insee(&self) -> Option<&str>;
    fn surface_ha(&self) -> Option<f64>;
    fn year(&self) -> Option<i32>;
}

impl Observation for FireFacts {
    fn departement(&self) -> Option<&str> {
        self.departement.as_deref()
    }

    fn insee(&self) -> Option<&str> {
        self.insee.as_deref()
    }

    fn surface_ha(&self) -> Option<f64> {
        self.surface_ha
    }

    fn year(&self) -> Option<i32> {
        self.timestamp.map(|t| t.year())
    }
}

impl Observation for FireRecord {
    fn departement(&self) -> Option<&str> {
        self.departement.as_deref()
    }

    fn insee(&self) -> Option<&str> {
        self.insee.as_deref()
    }

    fn surface_ha(&self) -> Option<f64> {
        self.surface_ha
    }

    fn year(&self) -> Option<i32> {
        Some(self.date.year())
    }
}

#[derive(Debug, Default)]
struct Bucket {
    fires: u64,
    surface_ha: f64,
}

/// Groups fires by INSEE code under the department allow-list and filters
pub struct InseeAggregator<'a> {
    allowed: &'a [String],
    filters: &'a MetricFilters,
}

impl<'a> InseeAggregator<'a> {
    pub fn new(allowed: &'a [String], filters: &'a MetricFilters) -> Self {
        Self { allowed, filters }
    }

    /// Filters run in order: allow-list, department, severity, year, minimum area
    pub fn accepts<O: Observation + ?Sized>(&self, fire: &O) -> bool {
        let departement = fire.departement().unwrap_or("");
        if !departement_allowed(self.allowed, departement) {
            return false;
        }
        if let Some(wanted) = self.filters.departement() {
            if departement != wanted {
                return false;
            }
        }

        let surface = fire.surface_ha();
        if let Some(wanted) = self.filters.alerte() {
            if Alerte::from_surface(surface).as_str() != wanted {
                return false;
            }
        }

        if let Some(wanted) = self.filters.year() {
            match fire.year() {
                Some(year) if year.to_string() == wanted => {}
                _ => return false,
            }
        }

        if let Some(min) = self.filters.min_surface() {
            if surface.unwrap_or(0.0) < min {
                return false;
            }
        }

        true
    }

    pub fn aggregate<'o, O, I>(&self, fires: I) -> BTreeMap<String, InseeMetric>
    where
        O: Observation + 'o,
        I: IntoIterator<Item = &'o O>,
    {
        let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();

        for fire in fires {
            let insee = match fire.insee() {
                Some(code) if !code.is_empty() => code,
                _ => continue,
            };
            if !self.accepts(fire) {
                continue;
            }

            let bucket = buckets.entry(insee.to_string()).or_default();
            bucket.fires += 1;
            bucket.surface_ha += fire.surface_ha().unwrap_or(0.0);
        }

        // Rounded once at emission so per-fire rounding never compounds
        buckets
            .into_iter()
            .map(|(insee, bucket)| {
                (
                    insee,
                    InseeMetric {
                        fires: bucket.fires,
                        surface_ha: round2(bucket.surface_ha),
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fact(dep: &str, insee: Option<&str>, surface: Option<f64>, year: Option<i32>) -> FireFacts {
        FireFacts {
            departement: Some(dep.to_string()).filter(|d| !d.is_empty()),
            insee: insee.map(str::to_string),
            surface_ha: surface,
            timestamp: year.map(|y| Utc.with_ymd_and_hms(y, 8, 1, 14, 0, 0).unwrap()),
        }
    }

    fn sample() -> Vec<FireFacts> {
        vec![
            fact("13", Some("13055"), Some(25.5), Some(2003)),
            fact("13", Some("13055"), Some(0.333), Some(2003)),
            fact("13", Some("13004"), None, Some(1990)),
            fact("83", Some("83137"), Some(120.0), Some(2003)),
            fact("2A", Some("2A004"), Some(4.0), Some(2003)),
            fact("13", None, Some(7.0), Some(2003)),
        ]
    }

    fn allowed() -> Vec<String> {
        vec!["13".to_string(), "83".to_string()]
    }

    #[test]
    fn test_groups_by_insee_and_skips_missing_key() {
        let allowed = allowed();
        let filters = MetricFilters::default();
        let metrics = InseeAggregator::new(&allowed, &filters).aggregate(&sample());

        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics["13055"].fires, 2);
        assert_eq!(metrics["13055"].surface_ha, 25.83);
        assert_eq!(metrics["13004"].fires, 1);
        assert_eq!(metrics["13004"].surface_ha, 0.0);
        assert!(!metrics.contains_key("2A004"));
    }

    #[test]
    fn test_rounds_only_at_emission() {
        let allowed = allowed();
        let filters = MetricFilters::default();
        let fires: Vec<FireFacts> = (0..3)
            .map(|_| fact("13", Some("13001"), Some(0.004), None))
            .collect();
        let metrics = InseeAggregator::new(&allowed, &filters).aggregate(&fires);

        // 3 x 0.004 = 0.012; per-addition rounding would have produced 0.0
        assert_eq!(metrics["13001"].surface_ha, 0.01);
    }

    #[test]
    fn test_departement_and_severity_filters() {
        let allowed = allowed();
        let filters = MetricFilters {
            departement: Some("13".to_string()),
            alerte: Some("Rouge".to_string()),
            ..Default::default()
        };
        let metrics = InseeAggregator::new(&allowed, &filters).aggregate(&sample());

        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics["13055"].fires, 1);
        assert_eq!(metrics["13055"].surface_ha, 25.5);
    }

    #[test]
    fn test_all_disables_filter() {
        let allowed = allowed();
        let filters = MetricFilters {
            departement: Some("all".to_string()),
            alerte: Some("all".to_string()),
            year: Some("all".to_string()),
            min_surface: Some("".to_string()),
        };
        let metrics = InseeAggregator::new(&allowed, &filters).aggregate(&sample());
        assert_eq!(metrics.len(), 3);
    }

    #[test]
    fn test_year_filter_excludes_undated() {
        let allowed = allowed();
        let filters = MetricFilters {
            year: Some("2003".to_string()),
            ..Default::default()
        };
        let mut fires = sample();
        fires.push(fact("83", Some("83050"), Some(3.0), None));

        let metrics = InseeAggregator::new(&allowed, &filters).aggregate(&fires);
        assert!(metrics.contains_key("83137"));
        assert!(!metrics.contains_key("13004"));
        assert!(!metrics.contains_key("83050"));
    }

    #[test]
    fn test_min_surface_treats_null_as_zero() {
        let allowed = allowed();
        let filters = MetricFilters {
            min_surface: Some("0".to_string()),
            ..Default::default()
        };
        let metrics = InseeAggregator::new(&allowed, &filters).aggregate(&sample());
        assert!(metrics.contains_key("13004"));

        let filters = MetricFilters {
            min_surface: Some("10,5".to_string()),
            ..Default::default()
        };
        let metrics = InseeAggregator::new(&allowed, &filters).aggregate(&sample());
        assert_eq!(metrics.keys().collect::<Vec<_>>(), vec!["13055", "83137"]);
        assert_eq!(metrics["13055"].fires, 1);
    }

    #[test]
    fn test_unparsable_min_surface_is_ignored() {
        let filters = MetricFilters {
            min_surface: Some("beaucoup".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.min_surface(), None);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let allowed = allowed();
        let filters = MetricFilters {
            year: Some("2003".to_string()),
            ..Default::default()
        };
        let aggregator = InseeAggregator::new(&allowed, &filters);
        let fires = sample();

        let first = serde_json::to_string(&aggregator.aggregate(&fires)).unwrap();
        let second = serde_json::to_string(&aggregator.aggregate(&fires)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_applied_echoes_non_empty_filters() {
        let filters = MetricFilters {
            departement: Some("13".to_string()),
            alerte: Some(String::new()),
            year: None,
            min_surface: Some("all".to_string()),
        };
        let applied = filters.applied();

        assert_eq!(applied.len(), 2);
        assert_eq!(applied["departement"], "13");
        assert_eq!(applied["min_surface"], "all");
    }
}
