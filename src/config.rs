// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the note database | `/data` |
//! | `NOTES_DB_FILE` | Database file name inside `DATA_DIR` | `notes.redb` |
//! | `NOTE_MAX_AGE_DAYS` | Notes older than this are purged | `30` |
//! | `PURGE_INTERVAL_SECS` | Time between purge sweeps | `3600` |
//! | `KEY_CACHE_CAPACITY` | Identities kept in the key lookup cache | `1024` |
//! | `KEY_CACHE_TTL_SECS` | Lifetime of a cached key | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::logging::LogFormat;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const NOTES_DB_FILE_ENV: &str = "NOTES_DB_FILE";
pub const NOTE_MAX_AGE_DAYS_ENV: &str = "NOTE_MAX_AGE_DAYS";
pub const PURGE_INTERVAL_SECS_ENV: &str = "PURGE_INTERVAL_SECS";
pub const KEY_CACHE_CAPACITY_ENV: &str = "KEY_CACHE_CAPACITY";
pub const KEY_CACHE_TTL_SECS_ENV: &str = "KEY_CACHE_TTL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_DB_FILE: &str = "notes.redb";
const DEFAULT_MAX_AGE_DAYS: u64 = 30;
const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3600;
const DEFAULT_KEY_CACHE_CAPACITY: usize = 1024;
const DEFAULT_KEY_CACHE_TTL_SECS: u64 = 300;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Resolved service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_file: String,
    pub note_max_age: Duration,
    pub purge_interval: Duration,
    pub key_cache_capacity: usize,
    pub key_cache_ttl: Duration,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_file: DEFAULT_DB_FILE.to_string(),
            note_max_age: Duration::from_secs(DEFAULT_MAX_AGE_DAYS * SECS_PER_DAY),
            purge_interval: Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECS),
            key_cache_capacity: DEFAULT_KEY_CACHE_CAPACITY,
            key_cache_ttl: Duration::from_secs(DEFAULT_KEY_CACHE_TTL_SECS),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to resolve variables. Unset variables fall back
    /// to their defaults; set but unparsable ones are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_age_days: u64 = parse_or(&lookup, NOTE_MAX_AGE_DAYS_ENV, DEFAULT_MAX_AGE_DAYS)?;
        let purge_secs: u64 =
            parse_or(&lookup, PURGE_INTERVAL_SECS_ENV, DEFAULT_PURGE_INTERVAL_SECS)?;
        let ttl_secs: u64 = parse_or(&lookup, KEY_CACHE_TTL_SECS_ENV, DEFAULT_KEY_CACHE_TTL_SECS)?;

        if purge_secs == 0 {
            return Err(ConfigError::Invalid {
                var: PURGE_INTERVAL_SECS_ENV,
                value: "0".to_string(),
            });
        }

        Ok(Self {
            data_dir: lookup(DATA_DIR_ENV).map(PathBuf::from).unwrap_or(defaults.data_dir),
            db_file: lookup(NOTES_DB_FILE_ENV).unwrap_or(defaults.db_file),
            note_max_age: Duration::from_secs(max_age_days.saturating_mul(SECS_PER_DAY)),
            purge_interval: Duration::from_secs(purge_secs),
            key_cache_capacity: parse_or(&lookup, KEY_CACHE_CAPACITY_ENV, DEFAULT_KEY_CACHE_CAPACITY)?,
            key_cache_ttl: Duration::from_secs(ttl_secs),
            log_format: parse_or(&lookup, LOG_FORMAT_ENV, LogFormat::Pretty)?,
        })
    }

    /// Full path of the database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}
