//! Process configuration loaded from environment variables.

use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

use crate::reconnect::ReconnectPolicy;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_JOB_CHANNEL: &str = "fibonacci_jobs";
pub const DEFAULT_RESULTS_KEY: &str = "fibonacci_results";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub max_retries: u32,
}

impl RedisSettings {
    pub fn url(&self) -> String {
        format!("redis://{}:{}", self.host, self.port)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl core::fmt::Debug for PostgresSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

impl PostgresSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub redis: RedisSettings,
    pub postgres: PostgresSettings,
    pub listen_addr: String,
    pub job_channel: String,
    /// Name of the cache hash holding current results.
    pub results_key: String,
    /// `false` wires in-memory stores, bus and an in-process worker.
    pub use_persistent_stores: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_string());

        Ok(Self {
            redis: RedisSettings {
                host: string("REDIS_HOST", "localhost"),
                port: parsed(&lookup, "REDIS_PORT", 6379)?,
                max_retries: parsed(&lookup, "REDIS_MAX_RETRIES", 10)?,
            },
            postgres: PostgresSettings {
                host: string("PGHOST", "localhost"),
                port: parsed(&lookup, "PGPORT", 5432)?,
                user: string("PGUSER", "postgres"),
                password: string("PGPASSWORD", "postgres"),
                database: string("PGDATABASE", "postgres"),
            },
            listen_addr: string("LISTEN_ADDR", DEFAULT_LISTEN_ADDR),
            job_channel: string("JOB_CHANNEL", DEFAULT_JOB_CHANNEL),
            results_key: string("RESULTS_KEY", DEFAULT_RESULTS_KEY),
            use_persistent_stores: parsed(&lookup, "USE_PERSISTENT_STORES", true)?,
        })
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::default().with_max_retries(self.redis.max_retries)
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.redis.url(), "redis://localhost:6379");
        assert_eq!(s.postgres.port, 5432);
        assert_eq!(s.listen_addr, "0.0.0.0:5000");
        assert_eq!(s.job_channel, "fibonacci_jobs");
        assert_eq!(s.results_key, "fibonacci_results");
        assert!(s.use_persistent_stores);
        assert_eq!(s.reconnect_policy().max_retries, 10);
    }

    #[test]
    fn overrides_are_read() {
        let s = settings(&[
            ("REDIS_HOST", "redis"),
            ("REDIS_PORT", "6380"),
            ("PGUSER", "fib"),
            ("USE_PERSISTENT_STORES", "false"),
            ("REDIS_MAX_RETRIES", "3"),
        ])
        .unwrap();
        assert_eq!(s.redis.url(), "redis://redis:6380");
        assert_eq!(s.postgres.user, "fib");
        assert!(!s.use_persistent_stores);
        assert_eq!(s.reconnect_policy().max_retries, 3);
    }

    #[test]
    fn invalid_numbers_fail() {
        let err = settings(&[("PGPORT", "abc")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PGPORT", .. }));
    }

    #[test]
    fn password_is_not_printed() {
        let s = settings(&[("PGPASSWORD", "hunter2")]).unwrap();
        assert!(!format!("{:?}", s.postgres).contains("hunter2"));
    }
}
