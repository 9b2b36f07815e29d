//! Configuration file structures for the qazo bot.
//!
//! The configuration is a YAML file. Any value can be overridden with an
//! environment variable prefixed with `QAZO_`, nested keys being separated by
//! `__` (e.g. `QAZO_MATRIX__PASSWORD`).
//!
//! # Configuration File Format
//!
//! ```yaml
//! # Matrix account of the bot, required
//! matrix:
//!   user_id: "@qazo:matrix.org"
//!   password: "secret-password"
//!   passphrase: "recovery-passphrase"
//!
//! # Reminder cadences and thresholds, optional
//! reminders:
//!   fine_interval: 60          # seconds
//!   coarse_interval: 600       # seconds
//!   day_boundary_interval: 60  # seconds
//!   tolerance_minutes: 2
//!   day_end_cutoff: "23:40"
//!   day_end_fallback: "23:59"
//!
//! # Inactivity sweep, optional
//! inactivity:
//!   threshold_hours: 48
//!   sweep_interval: 3600       # seconds
//!
//! # Prayer time computation, optional
//! prayer_times:
//!   method: "MuslimWorldLeague"
//!   madhab: "Hanafi"
//!   default_city: "Tashkent"
//!   radius_km: 100
//! ```

use std::time::Duration as StdDuration;

use anyhow::anyhow;
use chrono::Duration;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

use crate::{prayers::parse_hhmm, reminders::ReminderSettings};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub matrix: Matrix,

    #[serde(default)]
    pub reminders: Reminders,

    #[serde(default)]
    pub inactivity: Inactivity,

    #[serde(default)]
    pub prayer_times: PrayerTimes,
}

#[derive(Debug, Deserialize)]
pub struct Matrix {
    pub user_id: String,

    pub password: String,

    pub passphrase: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Reminders {
    /// Seconds between two "time has begun" checks
    pub fine_interval: u64,

    /// Seconds between two "did you pray?" rounds
    pub coarse_interval: u64,

    /// Seconds between two day boundary checks
    pub day_boundary_interval: u64,

    pub tolerance_minutes: i64,

    /// End of the isha window, `HH:MM`
    pub day_end_cutoff: String,

    /// Local time after which the current day is swept, `HH:MM`
    pub day_end_fallback: String,
}

impl Default for Reminders {
    fn default() -> Self {
        Reminders {
            fine_interval: 60,
            coarse_interval: 600,
            day_boundary_interval: 60,
            tolerance_minutes: 2,
            day_end_cutoff: "23:40".to_string(),
            day_end_fallback: "23:59".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Inactivity {
    pub threshold_hours: i64,

    /// Seconds between two sweeps
    pub sweep_interval: u64,
}

impl Default for Inactivity {
    fn default() -> Self {
        Inactivity {
            threshold_hours: 48,
            sweep_interval: 3600,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PrayerTimes {
    /// Calculation method name of the `salah` crate
    pub method: String,

    pub madhab: String,

    /// City given to new users until they set their location
    pub default_city: String,

    /// Largest distance between shared coordinates and the city they resolve to
    pub radius_km: f64,
}

impl Default for PrayerTimes {
    fn default() -> Self {
        PrayerTimes {
            method: "MuslimWorldLeague".to_string(),
            madhab: "Hanafi".to_string(),
            default_city: "Tashkent".to_string(),
            radius_km: 100.0,
        }
    }
}

impl Config {
    /// Loads the YAML file at `path`, then applies the `QAZO_` environment
    /// overrides.
    pub fn load(path: &str) -> Result<Config, figment::Error> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("QAZO_").split("__"))
            .extract()
    }

    /// Thresholds of the reminder engine.
    ///
    /// # Errors
    ///
    /// Fails when a time of day is not written as `HH:MM`, when the fallback
    /// is before the cutoff, or when a threshold is not positive.
    pub fn reminder_settings(&self) -> Result<ReminderSettings, anyhow::Error> {
        let day_end_cutoff = parse_hhmm(&self.reminders.day_end_cutoff).ok_or_else(|| {
            anyhow!("invalid day_end_cutoff '{}'", self.reminders.day_end_cutoff)
        })?;
        let day_end_fallback = parse_hhmm(&self.reminders.day_end_fallback).ok_or_else(|| {
            anyhow!("invalid day_end_fallback '{}'", self.reminders.day_end_fallback)
        })?;

        if day_end_fallback < day_end_cutoff {
            return Err(anyhow!(
                "day_end_fallback {} is before day_end_cutoff {}",
                day_end_fallback,
                day_end_cutoff
            ));
        }
        if self.reminders.tolerance_minutes < 0 || self.inactivity.threshold_hours <= 0 {
            return Err(anyhow!("tolerance and inactivity threshold must be positive"));
        }

        Ok(ReminderSettings {
            tolerance: Duration::minutes(self.reminders.tolerance_minutes),
            day_end_cutoff,
            day_end_fallback,
            inactivity_threshold: Duration::hours(self.inactivity.threshold_hours),
        })
    }
}

impl Reminders {
    pub fn fine_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.fine_interval.max(1))
    }

    pub fn coarse_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.coarse_interval.max(1))
    }

    pub fn day_boundary_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.day_boundary_interval.max(1))
    }
}

impl Inactivity {
    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.sweep_interval.max(1))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use chrono::NaiveTime;
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    const MINIMAL: &str = "matrix:\n  user_id: \"@qazo:example.com\"\n  password: \"secret\"\n  passphrase: \"phrase\"\n";

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_load_minimal_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, MINIMAL);

        let config = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(config.matrix.user_id, "@qazo:example.com");
        assert_eq!(config.reminders.coarse_interval, 600);
        assert_eq!(config.inactivity.threshold_hours, 48);
        assert_eq!(config.prayer_times.method, "MuslimWorldLeague");
        assert_eq!(config.prayer_times.default_city, "Tashkent");
    }

    #[test]
    #[serial]
    fn test_load_partial_section() {
        let dir = TempDir::new().unwrap();
        let content = format!("{MINIMAL}reminders:\n  tolerance_minutes: 5\n");
        let path = write_config(&dir, &content);

        let config = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(config.reminders.tolerance_minutes, 5);
        assert_eq!(config.reminders.fine_interval, 60);
        assert_eq!(config.reminders.day_end_cutoff, "23:40");
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, MINIMAL);

        // SAFETY: tests touching the environment are serialized
        unsafe {
            std::env::set_var("QAZO_MATRIX__PASSWORD", "from-env");
            std::env::set_var("QAZO_PRAYER_TIMES__DEFAULT_CITY", "Samarqand");
        }
        let config = Config::load(path.to_str().unwrap());
        unsafe {
            std::env::remove_var("QAZO_MATRIX__PASSWORD");
            std::env::remove_var("QAZO_PRAYER_TIMES__DEFAULT_CITY");
        }

        let config = config.unwrap();
        assert_eq!(config.matrix.password, "from-env");
        assert_eq!(config.prayer_times.default_city, "Samarqand");
    }

    #[test]
    #[serial]
    fn test_load_missing_matrix_section_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "reminders:\n  tolerance_minutes: 5\n");

        assert!(Config::load(path.to_str().unwrap()).is_err());
    }

    #[test]
    #[serial]
    fn test_reminder_settings() {
        let dir = TempDir::new().unwrap();
        let content = format!("{MINIMAL}reminders:\n  day_end_cutoff: \"23:30\"\n");
        let path = write_config(&dir, &content);
        let config = Config::load(path.to_str().unwrap()).unwrap();

        let settings = config.reminder_settings().unwrap();

        assert_eq!(settings.tolerance, Duration::minutes(2));
        assert_eq!(
            settings.day_end_cutoff,
            NaiveTime::from_hms_opt(23, 30, 0).unwrap()
        );
        assert_eq!(settings.inactivity_threshold, Duration::hours(48));
    }

    #[test]
    #[serial]
    fn test_reminder_settings_rejects_invalid_times() {
        let dir = TempDir::new().unwrap();

        let content = format!("{MINIMAL}reminders:\n  day_end_cutoff: \"late\"\n");
        let path = write_config(&dir, &content);
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert!(config.reminder_settings().is_err());

        let content = format!(
            "{MINIMAL}reminders:\n  day_end_cutoff: \"23:50\"\n  day_end_fallback: \"23:45\"\n"
        );
        let path = write_config(&dir, &content);
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert!(config.reminder_settings().is_err());
    }
}
