use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use utoipa::ToSchema;

use crate::fires::columns::ResolvedColumns;
use crate::fires::severity::Alerte;
use crate::utils::{parse_decimal, round2};

/// One registry row: literal header -> raw cell text
pub type RawRow = HashMap<String, String>;

/// Alert timestamp layouts seen across registry revisions, tried in order
const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y %H:%M", "%d/%m/%Y %H:%M:%S", ISO_FRACTION_FORMAT];

/// ISO layout whose fractional seconds are mandatory (1 to 6 digits)
const ISO_FRACTION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Canonical wildfire incident, built fresh per read and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FireRecord {
    pub id: i64,
    pub commune: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub surface_ha: Option<f64>,
    pub alerte: Alerte,
    pub cause: String,
    pub date: DateTime<Utc>,
    pub departement: Option<String>,
    pub insee: Option<String>,
}

/// Sequential identifiers for rows without a numeric source id
///
/// Scoped to a single ingestion: every read starts again at 1.
#[derive(Debug)]
pub struct FallbackIds {
    next: i64,
}

impl Default for FallbackIds {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackIds {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Fields shared by record normalization and aggregation
///
/// `surface_ha` is unrounded and `timestamp` is `None` when neither the alert
/// date nor the year column could be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FireFacts {
    pub departement: Option<String>,
    pub insee: Option<String>,
    pub surface_ha: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Whether a department passes the allow-list
///
/// An empty allow-list or an empty department code always passes.
pub fn departement_allowed(allowed: &[String], departement: &str) -> bool {
    allowed.is_empty() || departement.is_empty() || allowed.iter().any(|d| d == departement)
}

/// Parse an alert timestamp against the known layouts (interpreted as UTC)
pub fn parse_alert_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .filter(|format| **format != ISO_FRACTION_FORMAT || has_fraction(value))
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

// `%.f` also accepts a bare `...:SSZ`, which the registry layout does not allow
fn has_fraction(value: &str) -> bool {
    value
        .strip_suffix('Z')
        .and_then(|rest| rest.rsplit_once('.'))
        .is_some_and(|(_, digits)| {
            (1..=6).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit())
        })
}

/// January 1st, 00:00 UTC of the given year text
pub fn year_start(value: &str) -> Option<DateTime<Utc>> {
    let year = value.trim().parse::<i32>().ok()?;
    if !(1..=9999).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Converts raw registry rows into canonical records
pub struct RecordNormalizer<'a> {
    columns: &'a ResolvedColumns,
    allowed: &'a [String],
    now: DateTime<Utc>,
}

impl<'a> RecordNormalizer<'a> {
    /// # Arguments
    /// * `columns` - headers resolved for the source being read
    /// * `allowed` - department allow-list
    /// * `now` - processing time, the last-resort timestamp
    pub fn new(columns: &'a ResolvedColumns, allowed: &'a [String], now: DateTime<Utc>) -> Self {
        Self {
            columns,
            allowed,
            now,
        }
    }

    fn field<'r>(&self, row: &'r RawRow, column: &Option<String>) -> &'r str {
        column
            .as_ref()
            .and_then(|c| row.get(c))
            .map(|v| v.trim())
            .unwrap_or("")
    }

    pub fn departement<'r>(&self, row: &'r RawRow) -> &'r str {
        self.field(row, &self.columns.departement)
    }

    pub fn is_allowed(&self, row: &RawRow) -> bool {
        departement_allowed(self.allowed, self.departement(row))
    }

    /// Hectares field first, then square meters / 10 000
    pub fn surface_ha(&self, row: &RawRow) -> Option<f64> {
        let direct = self
            .columns
            .surface_ha
            .as_ref()
            .and_then(|_| parse_decimal(self.field(row, &self.columns.surface_ha)));

        direct.or_else(|| {
            self.columns
                .surface_m2
                .as_ref()
                .and_then(|_| parse_decimal(self.field(row, &self.columns.surface_m2)))
                .map(|m2| m2 / 10_000.0)
        })
    }

    /// Alert date, else January 1st of the year column
    pub fn timestamp(&self, row: &RawRow) -> Option<DateTime<Utc>> {
        parse_alert_timestamp(self.field(row, &self.columns.date_alerte)).or_else(|| {
            self.columns
                .annee
                .as_ref()
                .and_then(|_| year_start(self.field(row, &self.columns.annee)))
        })
    }

    pub fn facts(&self, row: &RawRow) -> FireFacts {
        FireFacts {
            departement: non_empty(self.departement(row)),
            insee: non_empty(self.field(row, &self.columns.insee)),
            surface_ha: self.surface_ha(row),
            timestamp: self.timestamp(row),
        }
    }

    /// Normalize one row, or `None` when its department is not allow-listed
    pub fn normalize(&self, row: &RawRow, ids: &mut FallbackIds) -> Option<FireRecord> {
        if !self.is_allowed(row) {
            return None;
        }

        let facts = self.facts(row);
        let date = facts.timestamp.unwrap_or_else(|| {
            debug!("No usable alert date or year, using processing time");
            self.now
        });

        let raw_id = self.field(row, &self.columns.numero);
        let id = match raw_id.parse::<i64>() {
            Ok(id) => id,
            Err(_) => {
                let id = ids.next_id();
                debug!("Non-numeric identifier {:?}, assigned fallback id {}", raw_id, id);
                id
            }
        };

        let origine = self.field(row, &self.columns.origine);
        let cause = if origine.is_empty() {
            "Inconnue".to_string()
        } else {
            format!("Origine {}", origine)
        };

        let commune = self.field(row, &self.columns.commune);

        Some(FireRecord {
            id,
            commune: if commune.is_empty() {
                "-".to_string()
            } else {
                commune.to_string()
            },
            latitude: None,
            longitude: None,
            surface_ha: facts.surface_ha.map(round2),
            alerte: Alerte::from_surface(facts.surface_ha),
            cause,
            date,
            departement: facts.departement,
            insee: facts.insee,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
