//! Per user, per day prayer status record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    prayers::{Prayer, PrayerStatus},
    store::UserId,
};

/// Statuses of the five prayers of one user on one calendar day.
///
/// Created lazily with every prayer pending. Statuses are indexed by
/// [`Prayer::index`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPrayerRecord {
    pub user_id: UserId,
    pub date: NaiveDate,
    statuses: [PrayerStatus; 5],
}

impl DailyPrayerRecord {
    pub fn new(user_id: UserId, date: NaiveDate) -> Self {
        DailyPrayerRecord {
            user_id,
            date,
            statuses: [PrayerStatus::Pending; 5],
        }
    }

    pub fn status(&self, prayer: Prayer) -> PrayerStatus {
        self.statuses[prayer.index()]
    }

    pub fn is_pending(&self, prayer: Prayer) -> bool {
        self.status(prayer).is_pending()
    }

    /// Prayers still pending, in chronological order.
    pub fn pending(&self) -> impl Iterator<Item = Prayer> + '_ {
        Prayer::ALL.into_iter().filter(|p| self.is_pending(*p))
    }

    pub fn has_pending(&self) -> bool {
        self.pending().next().is_some()
    }

    /// Moves a pending prayer to `status`.
    ///
    /// Returns `false` and leaves the record untouched when the prayer already
    /// left the pending state, or when `status` is pending itself.
    pub fn resolve(&mut self, prayer: Prayer, status: PrayerStatus) -> bool {
        if status.is_pending() || !self.is_pending(prayer) {
            return false;
        }
        self.statuses[prayer.index()] = status;
        true
    }
}
