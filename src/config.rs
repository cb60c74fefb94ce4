//! # Configuration
//!
//! Server settings are read from environment variables (optionally loaded
//! from a `.env` file by `main`). Every setting has a default so the server
//! starts with no configuration at all:
//!
//! ```env
//! APP_NAME=Resto API
//! DATABASE_URL=sqlite://resto.db?mode=rwc
//! DATABASE_MAX_CONNECTIONS=5
//! BIND_ADDRESS=0.0.0.0:8000
//! BACKEND_CORS_ORIGINS=http://localhost:8080
//! SECRET_KEY=change-me
//! ACCESS_TOKEN_EXPIRE_MINUTES=60
//! UPLOAD_DIR=uploads
//! ```

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_SECRET_KEY: &str = "change-me";

/// Accepted range for `ACCESS_TOKEN_EXPIRE_MINUTES`: one minute to one year.
pub const TOKEN_TTL_MINUTES: std::ops::RangeInclusive<i64> = 1..=60 * 24 * 365;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: String,
    pub cors_origins: Vec<String>,
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
    pub upload_dir: PathBuf,
}

impl Settings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Settings, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the settings from an arbitrary key lookup, falling back to the
    /// defaults for anything the lookup does not provide.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_max_connections = parse_number(
            "DATABASE_MAX_CONNECTIONS",
            get("DATABASE_MAX_CONNECTIONS", "5"),
        )?;
        let raw_ttl = get("ACCESS_TOKEN_EXPIRE_MINUTES", "60");
        let access_token_expire_minutes: i64 =
            parse_number("ACCESS_TOKEN_EXPIRE_MINUTES", raw_ttl.clone())?;
        if !TOKEN_TTL_MINUTES.contains(&access_token_expire_minutes) {
            return Err(ConfigError::InvalidValue {
                key: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: raw_ttl,
            });
        }

        let cors_origins = get("BACKEND_CORS_ORIGINS", "http://localhost:8080")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Settings {
            app_name: get("APP_NAME", "Resto API"),
            database_url: get("DATABASE_URL", "sqlite://resto.db?mode=rwc"),
            database_max_connections,
            bind_address: get("BIND_ADDRESS", "0.0.0.0:8000"),
            cors_origins,
            secret_key: get("SECRET_KEY", DEFAULT_SECRET_KEY),
            access_token_expire_minutes,
            upload_dir: PathBuf::from(get("UPLOAD_DIR", "uploads")),
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.app_name, "Resto API");
        assert_eq!(settings.bind_address, "0.0.0.0:8000");
        assert_eq!(settings.access_token_expire_minutes, 60);
        assert_eq!(settings.cors_origins, vec!["http://localhost:8080"]);
        assert!(settings.uses_default_secret());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let settings = Settings::from_lookup(lookup_from(&[(
            "BACKEND_CORS_ORIGINS",
            "http://a.test, http://b.test ,,",
        )]))
        .unwrap();
        assert_eq!(settings.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = Settings::from_lookup(lookup_from(&[("ACCESS_TOKEN_EXPIRE_MINUTES", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_EXPIRE_MINUTES"));
    }

    #[test]
    fn token_lifetime_must_be_in_range() {
        for value in ["0", "-5", "9223372036854775807", "525601"] {
            let err = Settings::from_lookup(lookup_from(&[("ACCESS_TOKEN_EXPIRE_MINUTES", value)]))
                .unwrap_err();
            assert!(err.to_string().contains(value), "{value} should be rejected");
        }

        let settings =
            Settings::from_lookup(lookup_from(&[("ACCESS_TOKEN_EXPIRE_MINUTES", "525600")])).unwrap();
        assert_eq!(settings.access_token_expire_minutes, 525_600);
    }
}
