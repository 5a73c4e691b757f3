//! Runtime configuration for project loading.
//!
//! # Responsibility
//! - Collect tunables for the media analysis tool and report rendering.
//! - Read overrides from the environment without failing on bad values.
//!
//! # Invariants
//! - `CoreConfig::from_env` never panics; invalid values fall back to defaults.

use crate::model::event::TimeFormat;
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

/// Overrides the media analysis executable (`ffprobe` on `PATH` otherwise).
pub const FFPROBE_PATH_ENV: &str = "BORIS_FFPROBE_PATH";
/// Media analysis timeout in milliseconds.
pub const FFPROBE_TIMEOUT_ENV: &str = "BORIS_FFPROBE_TIMEOUT_MS";
/// Report time format, `seconds` or `hhmmss`.
pub const TIME_FORMAT_ENV: &str = "BORIS_TIME_FORMAT";

const DEFAULT_FFPROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by the loader, the media analyzer and report rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Explicit media analysis executable; resolved on `PATH` when `None`.
    pub ffprobe_path: Option<PathBuf>,
    pub probe_timeout: Duration,
    pub time_format: TimeFormat,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: None,
            probe_timeout: DEFAULT_FFPROBE_TIMEOUT,
            time_format: TimeFormat::Seconds,
        }
    }
}

impl CoreConfig {
    /// Builds a configuration from `BORIS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration using `lookup` as the variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let ffprobe_path = lookup(FFPROBE_PATH_ENV)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let probe_timeout = match lookup(FFPROBE_TIMEOUT_ENV) {
            None => defaults.probe_timeout,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    warn!(
                        "event=config_load module=config status=fallback key={} value={}",
                        FFPROBE_TIMEOUT_ENV, raw
                    );
                    defaults.probe_timeout
                }
            },
        };

        let time_format = match lookup(TIME_FORMAT_ENV) {
            None => defaults.time_format,
            Some(raw) => parse_time_format(&raw).unwrap_or_else(|| {
                warn!(
                    "event=config_load module=config status=fallback key={} value={}",
                    TIME_FORMAT_ENV, raw
                );
                defaults.time_format
            }),
        };

        Self {
            ffprobe_path,
            probe_timeout,
            time_format,
        }
    }
}

/// Parses `seconds|s` or `hhmmss|hh:mm:ss` (case-insensitive).
pub fn parse_time_format(raw: &str) -> Option<TimeFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "s" | "seconds" => Some(TimeFormat::Seconds),
        "hhmmss" | "hh:mm:ss" => Some(TimeFormat::HhMmSs),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, FFPROBE_PATH_ENV, FFPROBE_TIMEOUT_ENV, TIME_FORMAT_ENV};
    use crate::model::event::TimeFormat;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn config_from(pairs: &[(&str, &str)]) -> CoreConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        CoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_variables_use_defaults() {
        assert_eq!(config_from(&[]), CoreConfig::default());
    }

    #[test]
    fn valid_overrides_are_applied() {
        let config = config_from(&[
            (FFPROBE_PATH_ENV, "/opt/ffmpeg/bin/ffprobe"),
            (FFPROBE_TIMEOUT_ENV, "2500"),
            (TIME_FORMAT_ENV, "HHMMSS"),
        ]);
        assert_eq!(
            config.ffprobe_path,
            Some(PathBuf::from("/opt/ffmpeg/bin/ffprobe"))
        );
        assert_eq!(config.probe_timeout, Duration::from_millis(2500));
        assert_eq!(config.time_format, TimeFormat::HhMmSs);
    }

    #[test]
    fn invalid_overrides_fall_back() {
        let config = config_from(&[
            (FFPROBE_PATH_ENV, "  "),
            (FFPROBE_TIMEOUT_ENV, "0"),
            (TIME_FORMAT_ENV, "minutes"),
        ]);
        assert_eq!(config, CoreConfig::default());
    }
}
