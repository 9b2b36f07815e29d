//! Prayer times of one day and the windows they define.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::prayers::{Prayer, TimesError};

/// Local clock times of the five prayers of one day, at minute precision.
///
/// The times are strictly increasing from fajr to isha, which is checked
/// again on deserialization. Serialized as `HH:MM` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPrayerTimes")]
pub struct DailyPrayerTimes {
    pub date: NaiveDate,
    #[serde(serialize_with = "hhmm::serialize")]
    times: [NaiveTime; 5],
}

#[derive(Deserialize)]
struct RawPrayerTimes {
    date: NaiveDate,
    #[serde(deserialize_with = "hhmm::deserialize")]
    times: [NaiveTime; 5],
}

impl TryFrom<RawPrayerTimes> for DailyPrayerTimes {
    type Error = TimesError;

    fn try_from(raw: RawPrayerTimes) -> Result<Self, Self::Error> {
        DailyPrayerTimes::new(raw.date, raw.times)
    }
}

impl DailyPrayerTimes {
    /// Builds the times of a day, truncating seconds and rejecting non
    /// increasing schedules.
    pub fn new(date: NaiveDate, times: [NaiveTime; 5]) -> Result<Self, TimesError> {
        let times = times.map(truncate_to_minute);
        if times.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(TimesError::NotIncreasing(date));
        }
        Ok(DailyPrayerTimes { date, times })
    }

    pub fn time(&self, prayer: Prayer) -> NaiveTime {
        self.times[prayer.index()]
    }

    /// End of the window of `prayer`: the start of the next prayer, or the
    /// day end cutoff for isha.
    ///
    /// When isha starts after the cutoff its window runs until the last
    /// minute of the day instead.
    pub fn window_end(&self, prayer: Prayer, day_end_cutoff: NaiveTime) -> NaiveTime {
        match prayer.next() {
            Some(next) => self.time(next),
            None if day_end_cutoff > self.time(prayer) => day_end_cutoff,
            None => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(day_end_cutoff),
        }
    }

    /// The prayer whose window contains `now`, if any.
    ///
    /// There is no current prayer before fajr or after the day end cutoff.
    pub fn current_prayer(&self, now: NaiveTime, day_end_cutoff: NaiveTime) -> Option<Prayer> {
        Prayer::ALL
            .into_iter()
            .find(|p| self.time(*p) <= now && now < self.window_end(*p, day_end_cutoff))
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Parses a `HH:MM` clock time.
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error, ser::SerializeSeq};

    pub fn serialize<S: Serializer>(times: &[NaiveTime; 5], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(times.len()))?;
        for time in times {
            seq.serialize_element(&time.format("%H:%M").to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[NaiveTime; 5], D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        let parsed = raw
            .iter()
            .map(|s| super::parse_hhmm(s).ok_or_else(|| D::Error::custom(format!("bad time '{s}'"))))
            .collect::<Result<Vec<_>, _>>()?;
        parsed
            .try_into()
            .map_err(|v: Vec<NaiveTime>| D::Error::invalid_length(v.len(), &"five prayer times"))
    }
}
