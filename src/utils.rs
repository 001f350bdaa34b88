/// Shared utility functions for the fire service
///
/// Parse a decimal number that may use a comma as decimal separator
///
/// Registry exports are produced with French locale settings, so areas show up
/// as "25,5" as often as "25.5". Empty or unparsable values yield `None`; a bad
/// number is never an error for the row that carries it.
///
/// # Examples
///
/// ```
/// use paca_fire_service::utils::parse_decimal;
///
/// assert_eq!(parse_decimal("25,5"), Some(25.5));
/// assert_eq!(parse_decimal(" 12.75 "), Some(12.75));
/// assert_eq!(parse_decimal(""), None);
/// assert_eq!(parse_decimal("n/a"), None);
/// ```
pub fn parse_decimal(value: &str) -> Option<f64> {
    let normalized = value.replace(',', ".");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to two decimals (hectares are reported to the hundredth)
///
/// ```
/// use paca_fire_service::utils::round2;
///
/// assert_eq!(round2(25.456), 25.46);
/// assert_eq!(round2(5.0), 5.0);
/// ```
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Normalize -0.0 to 0.0 for cleaner API responses
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Format a UTC timestamp the way every response carries it: `1973-01-09T13:50:00Z`
pub fn utc_iso(dt: chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}
