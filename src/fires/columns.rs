use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Collapse a header to its comparison key
///
/// NFKD-decomposes, drops combining marks, lowercases and keeps only ASCII
/// alphanumerics, so "Numéro", "NUMERO" and "num-ero" share one key.
pub fn normalize_key(value: &str) -> String {
    value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Lookup from normalized key to the literal header present in a source
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    by_key: HashMap<String, String>,
}

impl HeaderIndex {
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut by_key = HashMap::new();
        for header in headers {
            let header = header.as_ref();
            // First header wins when two collapse to the same key
            by_key
                .entry(normalize_key(header))
                .or_insert_with(|| header.to_string());
        }
        Self { by_key }
    }

    /// Resolve the first candidate (in priority order) present in the source
    ///
    /// Returns the literal header, or `None` when no candidate matches.
    pub fn resolve(&self, candidates: &[&str]) -> Option<&str> {
        candidates
            .iter()
            .find_map(|candidate| self.by_key.get(&normalize_key(candidate)))
            .map(String::as_str)
    }
}

pub const ANNEE: &[&str] = &["annee"];
pub const NUMERO: &[&str] = &["numero", "num"];
pub const DEPARTEMENT: &[&str] = &["departement"];
pub const INSEE: &[&str] = &["codeinsee", "insee", "codinsee"];
pub const COMMUNE: &[&str] = &["commune"];
pub const DATE_ALERTE: &[&str] = &["alerte"];
pub const ORIGINE: &[&str] = &["originedelalerte", "originedalerte"];
pub const SURFACE_HA: &[&str] = &["surfha"];
pub const SURFACE_M2: &[&str] = &["surfaceparcouruem2"];

/// Actual header names for every logical column the registry may carry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub annee: Option<String>,
    pub numero: Option<String>,
    pub departement: Option<String>,
    pub insee: Option<String>,
    pub commune: Option<String>,
    pub date_alerte: Option<String>,
    pub origine: Option<String>,
    pub surface_ha: Option<String>,
    pub surface_m2: Option<String>,
}

impl ResolvedColumns {
    pub fn resolve(index: &HeaderIndex) -> Self {
        let col = |candidates: &[&str]| index.resolve(candidates).map(str::to_string);

        Self {
            annee: col(ANNEE),
            numero: col(NUMERO),
            departement: col(DEPARTEMENT),
            insee: col(INSEE),
            commune: col(COMMUNE),
            date_alerte: col(DATE_ALERTE),
            origine: col(ORIGINE),
            surface_ha: col(SURFACE_HA),
            surface_m2: col(SURFACE_M2),
        }
    }

    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        Self::resolve(&HeaderIndex::new(headers))
    }
}
