//! Settings for callers that embed the engine
//!
//! The engine itself never reads configuration; these values are what a
//! caller threads into each `validate` / `apply_limit` call.

use crate::types::SqlMode;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

pub const ENV_SQL_MODE: &str = "NL2SQL_SQL_MODE";
pub const ENV_MAX_ROWS: &str = "NL2SQL_MAX_ROWS";
pub const ENV_MAX_SQL_STATEMENTS: &str = "NL2SQL_MAX_SQL_STATEMENTS";
pub const ENV_STATEMENT_TIMEOUT_MS: &str = "NL2SQL_STATEMENT_TIMEOUT_MS";

pub const DEFAULT_MAX_ROWS: usize = 200;
pub const DEFAULT_MAX_SQL_STATEMENTS: usize = 4;
pub const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 8000;

/// Safety limits and execution hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    /// Permission tier for generated SQL
    pub sql_mode: SqlMode,

    /// Row cap appended to read statements
    pub max_rows: usize,

    /// Largest statement batch accepted in one response
    pub max_sql_statements: usize,

    /// Per-statement timeout for the executor; not enforced here
    pub statement_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sql_mode: SqlMode::default(),
            max_rows: DEFAULT_MAX_ROWS,
            max_sql_statements: DEFAULT_MAX_SQL_STATEMENTS,
            statement_timeout_ms: DEFAULT_STATEMENT_TIMEOUT_MS,
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    ///
    /// Variables:
    /// - NL2SQL_SQL_MODE: read_only, write_no_delete or write_full (default read_only)
    /// - NL2SQL_MAX_ROWS: default 200
    /// - NL2SQL_MAX_SQL_STATEMENTS: default 4
    /// - NL2SQL_STATEMENT_TIMEOUT_MS: default 8000
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// Blank values use the default; values that fail to parse use the
    /// default and log a warning.
    ///
    /// # Examples
    /// ```
    /// # use nl2sql_safety::config::Settings;
    /// # use nl2sql_safety::SqlMode;
    /// let settings = Settings::from_lookup(|name| match name {
    ///     "NL2SQL_SQL_MODE" => Some("write_full".to_string()),
    ///     "NL2SQL_MAX_ROWS" => Some("50".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(settings.sql_mode, SqlMode::WriteFull);
    /// assert_eq!(settings.max_rows, 50);
    /// assert_eq!(settings.max_sql_statements, 4);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            sql_mode: parse_setting(&lookup, ENV_SQL_MODE, defaults.sql_mode),
            max_rows: parse_setting(&lookup, ENV_MAX_ROWS, defaults.max_rows),
            max_sql_statements: parse_setting(
                &lookup,
                ENV_MAX_SQL_STATEMENTS,
                defaults.max_sql_statements,
            ),
            statement_timeout_ms: parse_setting(
                &lookup,
                ENV_STATEMENT_TIMEOUT_MS,
                defaults.statement_timeout_ms,
            ),
        }
    }
}

fn parse_setting<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    let raw = match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "Ignoring invalid {}='{}' ({}), using default {}",
                name,
                raw,
                e,
                default
            );
            default
        }
    }
}
