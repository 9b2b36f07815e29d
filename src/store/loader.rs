//! Store persistence: loading and saving the JSON snapshot file.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::{
    prayers::{DailyPrayerRecord, DailyPrayerTimes},
    qazo::QazoLedger,
    store::{StoreError, User, UserId},
};

/// Everything the store persists, as written to disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub next_user_id: i64,
    pub users: Vec<User>,
    pub records: Vec<DailyPrayerRecord>,
    pub times: Vec<StoredTimes>,
    pub ledgers: Vec<QazoLedger>,
}

/// Cached prayer times of a user for one day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTimes {
    pub user_id: UserId,
    #[serde(flatten)]
    pub times: DailyPrayerTimes,
}

/// Reads and writes the store snapshot file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// snapshot, so a crash mid write never leaves a truncated file behind.
#[derive(Clone)]
pub struct StoreLoader {
    path: String,
}

impl StoreLoader {
    pub fn new(path: String) -> Self {
        StoreLoader { path }
    }

    /// Loads the snapshot from disk.
    ///
    /// A missing file yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed. A
    /// corrupted file is never replaced by an empty snapshot.
    pub async fn load(&self) -> Result<Snapshot, StoreError> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            warn!("no store found at {}, starting empty", self.path);
            return Ok(Snapshot::default());
        }

        let serialized = fs::read_to_string(&self.path).await?;
        let snapshot: Snapshot = serde_json::from_str(&serialized)?;

        info!(
            "loaded store with {} users and {} daily records",
            snapshot.users.len(),
            snapshot.records.len()
        );
        Ok(snapshot)
    }

    /// Persists the snapshot to disk.
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(snapshot)?;
        let tmp_path = format!("{}.tmp", self.path);

        fs::write(&tmp_path, serialized).await?;
        fs::rename(&tmp_path, &self.path).await?;

        debug!("store persisted to {}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::prayers::{Prayer, PrayerStatus, times::tests::sample_times};
    use crate::store::Location;

    fn path_in(dir: &TempDir) -> String {
        dir.path().join("store.json").to_string_lossy().to_string()
    }

    fn create_snapshot() -> Snapshot {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut record = DailyPrayerRecord::new(UserId(1), date);
        record.resolve(Prayer::Fajr, PrayerStatus::Missed);
        let mut ledger = QazoLedger::new(UserId(1));
        ledger.apply(Prayer::Fajr, 1);

        Snapshot {
            next_user_id: 2,
            users: vec![User {
                id: UserId(1),
                matrix_id: "@alice:example.com".to_string(),
                room_id: "!room:example.com".to_string(),
                location: Location {
                    city: "Toshkent".to_string(),
                    country: "Uzbekistan".to_string(),
                    timezone: chrono_tz::Asia::Tashkent,
                    latitude: 41.2995,
                    longitude: 69.2401,
                },
                blocked: false,
                last_activity: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            }],
            records: vec![record],
            times: vec![StoredTimes {
                user_id: UserId(1),
                times: sample_times(date),
            }],
            ledgers: vec![ledger],
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let loader = StoreLoader::new(path_in(&dir));

        let snapshot = loader.load().await.unwrap();

        assert_eq!(snapshot.next_user_id, 0);
        assert!(snapshot.users.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupted_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = path_in(&dir);
        fs::write(&path, "{ not json").await.unwrap();

        let result = StoreLoader::new(path).load().await;

        assert!(matches!(result, Err(StoreError::Serde(_))));
    }

    #[tokio::test]
    async fn test_persist_then_load() {
        let dir = TempDir::new().unwrap();
        let loader = StoreLoader::new(path_in(&dir));

        loader.persist(&create_snapshot()).await.unwrap();
        let loaded = loader.load().await.unwrap();

        assert_eq!(loaded.next_user_id, 2);
        assert_eq!(loaded.users[0].matrix_id, "@alice:example.com");
        assert_eq!(loaded.users[0].location.timezone, chrono_tz::Asia::Tashkent);
        assert_eq!(loaded.records[0].status(Prayer::Fajr), PrayerStatus::Missed);
        assert_eq!(loaded.ledgers[0].total(), 1);
        assert_eq!(loaded.times[0].times.time(Prayer::Isha).to_string(), "20:15:00");
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temporary_file() {
        let dir = TempDir::new().unwrap();
        let path = path_in(&dir);
        let loader = StoreLoader::new(path.clone());

        loader.persist(&create_snapshot()).await.unwrap();

        assert!(fs::try_exists(&path).await.unwrap());
        assert!(!fs::try_exists(format!("{path}.tmp")).await.unwrap());
    }
}
