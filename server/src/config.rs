use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;
use tapgame_core::ProgressPolicy;

/// Server configuration, read from the environment (and `.env` via dotenvy).
///
/// `BOT_TOKEN` and `DATABASE_URL` are required. Without a bot token there is no way to
/// tell real Telegram users from forged ones, so we refuse to start instead of serving
/// unauthenticated requests.
#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub progress_policy: ProgressPolicy,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bot_token = get("BOT_TOKEN").context("BOT_TOKEN must be set")?;
        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;

        let port = match get("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?,
            None => 3000,
        };

        let progress_policy = match get("PROGRESS_POLICY") {
            Some(policy) => policy.parse()?,
            None => ProgressPolicy::default(),
        };

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(max) => max
                .trim()
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {max}"))?,
            None => 5,
        };

        Ok(Self {
            bot_token,
            database_url,
            port,
            static_dir: get("STATIC_DIR").map(PathBuf::from),
            progress_policy,
            db_max_connections,
        })
    }
}

// Secrets stay out of the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bot_token", &"<redacted>")
            .field("database_url", &"<redacted>")
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .field("progress_policy", &self.progress_policy)
            .field("db_max_connections", &self.db_max_connections)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://localhost/tapgame"),
        ]))
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.progress_policy, ProgressPolicy::Conform);
        assert_eq!(config.db_max_connections, 5);
        assert!(config.static_dir.is_none());
    }

    #[test]
    fn missing_bot_token_is_fatal() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/db")]))
            .unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));

        let err = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "   "),
            ("DATABASE_URL", "postgres://localhost/db"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BOT_TOKEN"));
    }

    #[test]
    fn optional_vars_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "postgres://localhost/db"),
            ("PORT", "8080"),
            ("STATIC_DIR", "../webapp"),
            ("PROGRESS_POLICY", "monotonic"),
            ("DB_MAX_CONNECTIONS", "20"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, Some(PathBuf::from("../webapp")));
        assert_eq!(config.progress_policy, ProgressPolicy::Monotonic);
        assert_eq!(config.db_max_connections, 20);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = [("BOT_TOKEN", "123:abc"), ("DATABASE_URL", "postgres://x")];

        let mut vars = base.to_vec();
        vars.push(("PORT", "eighty"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());

        let mut vars = base.to_vec();
        vars.push(("PROGRESS_POLICY", "yolo"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "123:super-secret"),
            ("DATABASE_URL", "postgres://user:pw@host/db"),
        ]))
        .unwrap();

        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(!printed.contains("pw@host"));
    }
}
