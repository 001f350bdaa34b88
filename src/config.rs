use std::env;
use std::path::PathBuf;

pub const DEFAULT_DEPARTEMENTS: &str = "04,05,06,13,83,84";

#[derive(Debug, Clone)]
pub struct Config {
    /// Presence selects the relational provider for every request
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    /// Allow-listed department codes; empty disables department filtering
    pub departements: Vec<String>,
    pub max_fires: usize,
    pub fire_csv_path: PathBuf,
    pub fire_count: usize,
    pub seed: Option<u64>,
    pub cartes_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: None,
            server_host: "0.0.0.0".to_string(),
            server_port: 8000,
            departements: parse_departements(DEFAULT_DEPARTEMENTS),
            max_fires: 500,
            fire_csv_path: PathBuf::from("data/liste_incendies_all.csv"),
            fire_count: 30,
            seed: None,
            cartes_dir: PathBuf::from("data/cartes"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        Ok(Config {
            database_url: optional_var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(defaults.server_port),
            departements: parse_departements(
                &env::var("DEPARTEMENTS").unwrap_or_else(|_| DEFAULT_DEPARTEMENTS.to_string()),
            ),
            max_fires: env::var("MAX_FIRES")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(defaults.max_fires),
            fire_csv_path: optional_var("FIRE_CSV_PATH")?
                .map(PathBuf::from)
                .unwrap_or(defaults.fire_csv_path),
            fire_count: env::var("FIRE_COUNT")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(defaults.fire_count),
            seed: optional_var("SEED")?.and_then(|s| parse_seed(&s)),
            cartes_dir: optional_var("CARTES_DIR")?
                .map(PathBuf::from)
                .unwrap_or(defaults.cartes_dir),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Read a variable, treating absent and blank values alike
fn optional_var(key: &str) -> Result<Option<String>, env::VarError> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Split a comma-separated department list, dropping blank entries
pub fn parse_departements(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

/// Only an all-digits seed makes synthetic data deterministic
fn parse_seed(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 9] = [
        "DATABASE_URL",
        "SERVER_HOST",
        "SERVER_PORT",
        "DEPARTEMENTS",
        "MAX_FIRES",
        "FIRE_CSV_PATH",
        "FIRE_COUNT",
        "SEED",
        "CARTES_DIR",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_parse_departements_drops_blanks() {
        assert_eq!(parse_departements(" 13, ,83,"), vec!["13", "83"]);
        assert!(parse_departements("").is_empty());
    }

    #[test]
    fn test_parse_seed_requires_digits() {
        assert_eq!(parse_seed("42"), Some(42));
        assert_eq!(parse_seed("-1"), None);
        assert_eq!(parse_seed("abc"), None);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert!(config.database_url.is_none());
        assert_eq!(config.departements, vec!["04", "05", "06", "13", "83", "84"]);
        assert_eq!(config.max_fires, 500);
        assert_eq!(config.fire_count, 30);
        assert_eq!(config.server_addr(), "0.0.0.0:8000");
        assert!(config.seed.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://fires@localhost/fires");
        env::set_var("DEPARTEMENTS", "13,83");
        env::set_var("MAX_FIRES", "not-a-number");
        env::set_var("SEED", "7");
        env::set_var("FIRE_CSV_PATH", "/tmp/incendies.csv");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://fires@localhost/fires")
        );
        assert_eq!(config.departements, vec!["13", "83"]);
        assert_eq!(config.max_fires, 500);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.fire_csv_path, PathBuf::from("/tmp/incendies.csv"));
    }

    #[test]
    #[serial]
    fn test_blank_database_url_is_absent() {
        clear_env();
        env::set_var("DATABASE_URL", "   ");
        let config = Config::from_env().unwrap();
        clear_env();

        assert!(config.database_url.is_none());
    }
}
