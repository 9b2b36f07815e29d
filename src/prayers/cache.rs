//! Per user, per day prayer time cache.

use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, info};

use crate::{
    prayers::{DailyPrayerTimes, TimeService, TimesError},
    store::{Store, User},
};

/// Caches the prayer times of each user and day in the [`Store`].
///
/// Times are computed once per user and day through the [`TimeService`] and
/// recomputed lazily whenever the cached entry is missing, for instance after
/// the user moved to another city.
pub struct PrayerTimesCache<T: TimeService> {
    service: T,
    store: Arc<Store>,
}

impl<T: TimeService> PrayerTimesCache<T> {
    pub fn new(service: T, store: Arc<Store>) -> Self {
        PrayerTimesCache { service, store }
    }

    /// Returns the cached times of `date` for `user`, computing and caching
    /// them first when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the computation fails or the result cannot be
    /// persisted.
    pub async fn get_or_compute(
        &self,
        user: &User,
        date: NaiveDate,
    ) -> Result<DailyPrayerTimes, TimesError> {
        if let Some(times) = self.store.times(user.id, date).await {
            return Ok(times);
        }

        debug!("no cached prayer times for user {} on {}", user.id, date);
        let times = self.service.compute_times(
            date,
            user.location.latitude,
            user.location.longitude,
            user.timezone(),
        )?;
        self.store.save_times(user.id, times.clone()).await?;

        Ok(times)
    }

    /// Drops the cached times of `user` from `from` onward. Past days keep
    /// the times they were tracked with.
    pub async fn invalidate_from(&self, user: &User, from: NaiveDate) -> Result<(), TimesError> {
        let removed = self.store.invalidate_times_from(user.id, from).await?;
        info!(
            "invalidated {} cached prayer time entries of user {} from {}",
            removed, user.id, from
        );
        Ok(())
    }
}
