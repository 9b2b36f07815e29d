//! The five daily prayers and the status a prayer can have on a given day.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// One of the five daily prayers, in the order they occur during the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    /// All prayers in chronological order.
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    /// Position of the prayer in [`Prayer::ALL`], used to index per-prayer arrays.
    pub fn index(self) -> usize {
        match self {
            Prayer::Fajr => 0,
            Prayer::Dhuhr => 1,
            Prayer::Asr => 2,
            Prayer::Maghrib => 3,
            Prayer::Isha => 4,
        }
    }

    /// The prayer following this one on the same day, `None` after isha.
    pub fn next(self) -> Option<Prayer> {
        Prayer::ALL.get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Dhuhr => "dhuhr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Isha => "isha",
        }
    }

    /// Human readable name with the local (uzbek) name in parenthesis.
    pub fn display_name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr (Bomdod)",
            Prayer::Dhuhr => "Dhuhr (Peshin)",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib (Shom)",
            Prayer::Isha => "Isha (Xufton)",
        }
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a prayer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown prayer '{0}'")]
pub struct UnknownPrayer(pub String);

impl FromStr for Prayer {
    type Err = UnknownPrayer;

    /// Accepts the arabic transliterations and the uzbek names users type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fajr" | "bomdod" => Ok(Prayer::Fajr),
            "dhuhr" | "zuhr" | "peshin" => Ok(Prayer::Dhuhr),
            "asr" => Ok(Prayer::Asr),
            "maghrib" | "shom" => Ok(Prayer::Maghrib),
            "isha" | "xufton" | "qufton" => Ok(Prayer::Isha),
            other => Err(UnknownPrayer(other.to_string())),
        }
    }
}

/// Status of one prayer on one day.
///
/// `Pending` is the only non terminal state: once a prayer is `Read` or
/// `Missed` it stays that way for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerStatus {
    #[default]
    Pending,
    Read,
    Missed,
}

impl PrayerStatus {
    pub fn is_pending(self) -> bool {
        self == PrayerStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrayerStatus::Pending => "pending",
            PrayerStatus::Read => "read",
            PrayerStatus::Missed => "missed",
        }
    }
}

impl fmt::Display for PrayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
