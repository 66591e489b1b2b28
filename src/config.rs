//! Runtime configuration for the hub, the monitor and the record tool.
//!
//! Values come from environment variables and may be overridden by CLI flags.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `TREASURE_HUNTS_DIR` | `hunts` | Root directory holding one directory per hunt |
//! | `TREASURE_MAILBOX_DIR` | `.` | Directory of `monitor_cmd.txt` / `monitor_args.txt` |
//! | `TREASURE_POLL_MS` | 1000 | Monitor fallback poll interval when no wake arrives |
//! | `TREASURE_RELAY_DELAY_MS` | 1000 | Hub wait between sending a command and draining output |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const HUNTS_DIR_VAR: &str = "TREASURE_HUNTS_DIR";
pub const MAILBOX_DIR_VAR: &str = "TREASURE_MAILBOX_DIR";
pub const POLL_MS_VAR: &str = "TREASURE_POLL_MS";
pub const RELAY_DELAY_MS_VAR: &str = "TREASURE_RELAY_DELAY_MS";

const DEFAULT_HUNTS_DIR: &str = "hunts";
const DEFAULT_MAILBOX_DIR: &str = ".";
const DEFAULT_POLL_MS: u64 = 1000;
const DEFAULT_RELAY_DELAY_MS: u64 = 1000;

/// Upper bound for either interval; anything longer is almost certainly a typo.
const MAX_INTERVAL_MS: u64 = 60_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    pub hunts_dir: PathBuf,
    pub mailbox_dir: PathBuf,
    pub poll_interval: Duration,
    pub relay_delay: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            hunts_dir: PathBuf::from(DEFAULT_HUNTS_DIR),
            mailbox_dir: PathBuf::from(DEFAULT_MAILBOX_DIR),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            relay_delay: Duration::from_millis(DEFAULT_RELAY_DELAY_MS),
        }
    }
}

impl HubConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. `from_env` is the
    /// production entry point; tests pass a closure over a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            hunts_dir: non_empty(HUNTS_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.hunts_dir),
            mailbox_dir: non_empty(MAILBOX_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.mailbox_dir),
            poll_interval: match non_empty(POLL_MS_VAR) {
                Some(raw) => parse_millis(POLL_MS_VAR, &raw)?,
                None => defaults.poll_interval,
            },
            relay_delay: match non_empty(RELAY_DELAY_MS_VAR) {
                Some(raw) => parse_millis(RELAY_DELAY_MS_VAR, &raw)?,
                None => defaults.relay_delay,
            },
        })
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected milliseconds, got '{raw}'"),
    })?;
    if ms == 0 || ms > MAX_INTERVAL_MS {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("must be between 1 and {MAX_INTERVAL_MS} ms"),
        });
    }
    Ok(Duration::from_millis(ms))
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = HubConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HubConfig::default());
        assert_eq!(config.hunts_dir, PathBuf::from("hunts"));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[test]
    fn reads_overrides() {
        let config = HubConfig::from_lookup(lookup(&[
            (HUNTS_DIR_VAR, "/tmp/h"),
            (MAILBOX_DIR_VAR, "/tmp/m"),
            (POLL_MS_VAR, "50"),
            (RELAY_DELAY_MS_VAR, " 250 "),
        ]))
        .unwrap();
        assert_eq!(config.hunts_dir, PathBuf::from("/tmp/h"));
        assert_eq!(config.mailbox_dir, PathBuf::from("/tmp/m"));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.relay_delay, Duration::from_millis(250));
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let config = HubConfig::from_lookup(lookup(&[(HUNTS_DIR_VAR, "  ")])).unwrap();
        assert_eq!(config.hunts_dir, PathBuf::from("hunts"));
    }

    #[test]
    fn rejects_bad_intervals() {
        let err = HubConfig::from_lookup(lookup(&[(POLL_MS_VAR, "soon")])).unwrap_err();
        assert!(err.to_string().contains(POLL_MS_VAR));

        assert!(HubConfig::from_lookup(lookup(&[(RELAY_DELAY_MS_VAR, "0")])).is_err());
        assert!(HubConfig::from_lookup(lookup(&[(RELAY_DELAY_MS_VAR, "600000")])).is_err());
    }
}
