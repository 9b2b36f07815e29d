//! Astronomical prayer time computation.
//!
//! The engine only needs five local clock times per day; how they are
//! computed is hidden behind the [`TimeService`] trait. [`SalahTimeService`]
//! is the offline implementation backed by the `salah` crate.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use log::debug;
use mockall::automock;
use salah::prelude::{
    Configuration, Coordinates, Madhab, Method, Prayer as SalahPrayer, PrayerSchedule,
};

use crate::prayers::{DailyPrayerTimes, TimesError};

/// Computes the prayer times of a day for a location.
#[automock]
pub trait TimeService: Send + Sync {
    /// Returns the five local prayer times of `date` at the given coordinates,
    /// expressed in `timezone`.
    fn compute_times(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
        timezone: Tz,
    ) -> Result<DailyPrayerTimes, TimesError>;
}

/// Offline time service using the `salah` calculation library.
pub struct SalahTimeService {
    method: String,
    madhab: String,
}

impl SalahTimeService {
    /// Creates the service, validating the calculation method and madhab names.
    ///
    /// # Errors
    ///
    /// Returns [`TimesError::UnknownMethod`] or [`TimesError::UnknownMadhab`]
    /// when a name is not recognized.
    pub fn new(method: &str, madhab: &str) -> Result<Self, TimesError> {
        parse_method(method)?;
        parse_madhab(madhab)?;
        Ok(SalahTimeService {
            method: method.to_string(),
            madhab: madhab.to_string(),
        })
    }
}

impl TimeService for SalahTimeService {
    fn compute_times(
        &self,
        date: NaiveDate,
        latitude: f64,
        longitude: f64,
        timezone: Tz,
    ) -> Result<DailyPrayerTimes, TimesError> {
        debug!("computing prayer times for {date} at ({latitude}, {longitude}) in {timezone}");

        let params = Configuration::with(parse_method(&self.method)?, parse_madhab(&self.madhab)?);
        let schedule = PrayerSchedule::new()
            .on(date)
            .for_location(Coordinates::new(latitude, longitude))
            .with_configuration(params)
            .calculate()
            .map_err(|e| TimesError::Calculation(e.to_string()))?;

        let local = |utc: DateTime<Utc>| utc.with_timezone(&timezone).time();

        DailyPrayerTimes::new(
            date,
            [
                local(schedule.time(SalahPrayer::Fajr)),
                local(schedule.time(SalahPrayer::Dhuhr)),
                local(schedule.time(SalahPrayer::Asr)),
                local(schedule.time(SalahPrayer::Maghrib)),
                local(schedule.time(SalahPrayer::Isha)),
            ],
        )
    }
}

fn parse_method(name: &str) -> Result<Method, TimesError> {
    match name {
        "MuslimWorldLeague" => Ok(Method::MuslimWorldLeague),
        "Egyptian" => Ok(Method::Egyptian),
        "Karachi" => Ok(Method::Karachi),
        "UmmAlQura" => Ok(Method::UmmAlQura),
        "Dubai" => Ok(Method::Dubai),
        "MoonsightingCommittee" => Ok(Method::MoonsightingCommittee),
        "NorthAmerica" => Ok(Method::NorthAmerica),
        "Kuwait" => Ok(Method::Kuwait),
        "Qatar" => Ok(Method::Qatar),
        "Singapore" => Ok(Method::Singapore),
        "Tehran" => Ok(Method::Tehran),
        "Turkey" => Ok(Method::Turkey),
        _ => Err(TimesError::UnknownMethod(name.to_string())),
    }
}

fn parse_madhab(name: &str) -> Result<Madhab, TimesError> {
    match name {
        "Hanafi" => Ok(Madhab::Hanafi),
        "Shafi" | "Shafi'i" => Ok(Madhab::Shafi),
        _ => Err(TimesError::UnknownMadhab(name.to_string())),
    }
}
