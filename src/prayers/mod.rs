//! Prayers, their daily status records and their daily times.
//!
//! - [`Prayer`] and [`PrayerStatus`] - the five prayers and the
//!   `pending → read | missed` state machine
//! - [`DailyPrayerRecord`] - statuses of one user on one day
//! - [`DailyPrayerTimes`] - clock times of one day and the prayer windows
//! - [`TimeService`] - astronomical computation collaborator
//! - [`PrayerTimesCache`] - lazily computed per user, per day times

use chrono::NaiveDate;

use crate::store::StoreError;

mod cache;
mod prayer;
mod record;
mod time_service;
pub(crate) mod times;

pub use crate::prayers::{
    cache::PrayerTimesCache,
    prayer::{Prayer, PrayerStatus, UnknownPrayer},
    record::DailyPrayerRecord,
    time_service::{SalahTimeService, TimeService},
    times::{DailyPrayerTimes, parse_hhmm},
};

#[cfg(test)]
pub use crate::prayers::time_service::MockTimeService;

/// Errors raised while obtaining prayer times.
#[derive(Debug, thiserror::Error)]
pub enum TimesError {
    #[error("unknown calculation method '{0}'")]
    UnknownMethod(String),
    #[error("unknown madhab '{0}'")]
    UnknownMadhab(String),
    #[error("prayer time calculation failed: {0}")]
    Calculation(String),
    #[error("prayer times of {0} are not increasing")]
    NotIncreasing(NaiveDate),
    #[error(transparent)]
    Store(#[from] StoreError),
}
