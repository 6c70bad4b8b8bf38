use std::env;

use thiserror::Error;

const DEFAULT_DATABASE_NAME: &str = "Task-manager";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
const DEFAULT_SESSION_TTL_HOURS: i64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// How `PUT /tasks/{id}` treats an identifier with no matching record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Answer 404.
    Strict,
    /// Insert a new record under the requested identifier.
    Upsert,
}

/// What an update does with the stored `createdAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedAtPolicy {
    Preserve,
    Reset,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub production: bool,
    pub session_ttl_hours: i64,
    pub update_policy: UpdatePolicy,
    pub created_at_policy: CreatedAtPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mongo_uri = match get("MONGO_URI") {
            Some(uri) => uri,
            None => {
                let user = get("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?;
                let pass = get("DB_PASS").ok_or(ConfigError::Missing("DB_PASS"))?;
                let host = get("DB_HOST").ok_or(ConfigError::Missing("DB_HOST"))?;
                format!("mongodb+srv://{}:{}@{}/?retryWrites=true&w=majority", user, pass, host)
            }
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]);

        let session_ttl_hours = match get("SESSION_TTL_HOURS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => return Err(ConfigError::Invalid { key: "SESSION_TTL_HOURS", value: raw }),
            },
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        let update_policy = match get("TASK_UPDATE_POLICY").as_deref().map(str::trim) {
            None | Some("upsert") => UpdatePolicy::Upsert,
            Some("strict") => UpdatePolicy::Strict,
            Some(other) => {
                return Err(ConfigError::Invalid { key: "TASK_UPDATE_POLICY", value: other.to_string() })
            }
        };

        let created_at_policy = match get("TASK_UPDATE_CREATED_AT").as_deref().map(str::trim) {
            None | Some("preserve") => CreatedAtPolicy::Preserve,
            Some("reset") => CreatedAtPolicy::Reset,
            Some(other) => {
                return Err(ConfigError::Invalid { key: "TASK_UPDATE_CREATED_AT", value: other.to_string() })
            }
        };

        Ok(Self {
            mongo_uri,
            database_name: get("DATABASE_NAME").unwrap_or_else(|| DEFAULT_DATABASE_NAME.to_string()),
            jwt_secret: get("ACCESS_TOKEN_SECRET").ok_or(ConfigError::Missing("ACCESS_TOKEN_SECRET"))?,
            port,
            allowed_origins,
            production: get("APP_ENV").map(|v| v.trim() == "production").unwrap_or(false),
            session_ttl_hours,
            update_policy,
            created_at_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let config = Config::from_lookup(lookup(&[
            ("MONGO_URI", "mongodb://localhost:27017"),
            ("ACCESS_TOKEN_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.database_name, "Task-manager");
        assert_eq!(config.port, 5000);
        assert_eq!(config.allowed_origins, vec!["http://localhost:5173".to_string()]);
        assert!(!config.production);
        assert_eq!(config.session_ttl_hours, 10);
        assert_eq!(config.update_policy, UpdatePolicy::Upsert);
        assert_eq!(config.created_at_policy, CreatedAtPolicy::Preserve);
    }

    #[test]
    fn builds_srv_uri_from_credential_parts() {
        let config = Config::from_lookup(lookup(&[
            ("DB_USER", "alice"),
            ("DB_PASS", "pw"),
            ("DB_HOST", "cluster0.example.net"),
            ("ACCESS_TOKEN_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(
            config.mongo_uri,
            "mongodb+srv://alice:pw@cluster0.example.net/?retryWrites=true&w=majority"
        );
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Config::from_lookup(lookup(&[("MONGO_URI", "mongodb://localhost")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ACCESS_TOKEN_SECRET"));
    }

    #[test]
    fn missing_credentials_are_reported_without_uri() {
        let err = Config::from_lookup(lookup(&[
            ("DB_USER", "alice"),
            ("ACCESS_TOKEN_SECRET", "s3cret"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("DB_PASS"));
    }

    #[test]
    fn parses_explicit_settings() {
        let config = Config::from_lookup(lookup(&[
            ("MONGO_URI", "mongodb://db"),
            ("ACCESS_TOKEN_SECRET", "s3cret"),
            ("PORT", "8080"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example ,"),
            ("APP_ENV", "production"),
            ("TASK_UPDATE_POLICY", "strict"),
            ("TASK_UPDATE_CREATED_AT", "reset"),
            ("SESSION_TTL_HOURS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(config.production);
        assert_eq!(config.update_policy, UpdatePolicy::Strict);
        assert_eq!(config.created_at_policy, CreatedAtPolicy::Reset);
        assert_eq!(config.session_ttl_hours, 2);
    }

    #[test]
    fn rejects_unknown_policy_and_bad_port() {
        let err = Config::from_lookup(lookup(&[
            ("MONGO_URI", "mongodb://db"),
            ("ACCESS_TOKEN_SECRET", "s3cret"),
            ("TASK_UPDATE_POLICY", "merge"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "TASK_UPDATE_POLICY", .. }));

        let err = Config::from_lookup(lookup(&[
            ("MONGO_URI", "mongodb://db"),
            ("ACCESS_TOKEN_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }
}
