//! Pure escalation rules: which reminder each pending prayer deserves at a
//! given local time.

use chrono::{Duration, NaiveTime};

use crate::{
    prayers::{DailyPrayerRecord, DailyPrayerTimes, Prayer},
    reminders::Tier,
};

/// Pending prayers whose time is within `tolerance` of `now`, either side.
pub fn due_announcements(
    times: &DailyPrayerTimes,
    record: &DailyPrayerRecord,
    now: NaiveTime,
    tolerance: Duration,
) -> Vec<Prayer> {
    record
        .pending()
        .filter(|p| {
            let delta = now.signed_duration_since(times.time(*p));
            delta.abs() <= tolerance
        })
        .collect()
}

/// The tier every pending prayer whose time has passed should be reminded
/// at, in prayer order.
///
/// The current prayer gets [`Tier::Pending`]. A prayer whose window is over
/// gets [`Tier::Missed`]. A passed prayer with its window still open but not
/// current, which only happens around the day end cutoff, stays at
/// [`Tier::Pending`].
pub fn pending_escalations(
    times: &DailyPrayerTimes,
    record: &DailyPrayerRecord,
    now: NaiveTime,
    day_end_cutoff: NaiveTime,
) -> Vec<(Prayer, Tier)> {
    let current = times.current_prayer(now, day_end_cutoff);

    record
        .pending()
        .filter(|p| now > times.time(*p))
        .map(|p| {
            let tier = if current == Some(p) {
                Tier::Pending
            } else if now >= times.window_end(p, day_end_cutoff) {
                Tier::Missed
            } else {
                Tier::Pending
            };
            (p, tier)
        })
        .collect()
}
