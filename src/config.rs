use tracing::warn;

/// Runtime configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string. When unset the in-memory store is used.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: String,
    /// Family used when a request carries no `x-family-id` header
    pub default_family_id: i64,
    /// Stamps per card for newly created children
    pub default_target_stamps: i32,
    pub max_comment_length: usize,
    /// Upsert the built-in reward catalog at startup
    pub seed_catalog: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 5,
            bind_addr: "0.0.0.0:3000".to_string(),
            default_family_id: 1,
            default_target_stamps: 10,
            max_comment_length: 500,
            seed_catalog: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, falling back to defaults
    /// for missing or unparsable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            default_family_id: parse_or(&lookup, "DEFAULT_FAMILY_ID", defaults.default_family_id),
            default_target_stamps: parse_or(
                &lookup,
                "DEFAULT_TARGET_STAMPS",
                defaults.default_target_stamps,
            ),
            max_comment_length: parse_or(&lookup, "MAX_COMMENT_LENGTH", defaults.max_comment_length),
            seed_catalog: parse_or(&lookup, "SEED_CATALOG", defaults.seed_catalog),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "Ignoring unparsable config value");
            default
        }),
        None => default,
    }
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
    fn test_defaults_when_environment_empty() {
        let config = AppConfig::from_lookup(lookup_from(&[]));

        assert!(config.database_url.is_none());
        assert_eq!(config.default_family_id, 1);
        assert_eq!(config.default_target_stamps, 10);
        assert_eq!(config.max_comment_length, 500);
        assert!(config.seed_catalog);
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/stamps"),
            ("DEFAULT_FAMILY_ID", "7"),
            ("DEFAULT_TARGET_STAMPS", "5"),
            ("SEED_CATALOG", "false"),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ]));

        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/stamps")
        );
        assert_eq!(config.default_family_id, 7);
        assert_eq!(config.default_target_stamps, 5);
        assert!(!config.seed_catalog);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DEFAULT_TARGET_STAMPS", "lots"),
            ("DATABASE_URL", "  "),
        ]));

        assert_eq!(config.default_target_stamps, 10);
        assert!(config.database_url.is_none());
    }
}
