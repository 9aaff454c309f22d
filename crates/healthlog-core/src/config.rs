//! Store configuration.

use std::path::PathBuf;

/// Default SQLite file, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "health_log.db";

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "healthlog_core=info";

/// Configuration loaded from environment variables.
///
/// All fields have defaults suitable for a single local user.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables (and a `.env` file, if
    /// present) with defaults.
    ///
    /// | Env Var             | Default                |
    /// |---------------------|------------------------|
    /// | `HEALTHLOG_DB_PATH` | `health_log.db`        |
    /// | `HEALTHLOG_LOG`     | `healthlog_core=info`  |
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            database_path: get("HEALTHLOG_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            log_filter: get("HEALTHLOG_LOG").unwrap_or(defaults.log_filter),
        }
    }
}
