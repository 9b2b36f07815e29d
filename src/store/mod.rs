//! Durable state of the bot: users, daily prayer records, cached prayer times
//! and qazo ledgers.
//!
//! The [`Store`] keeps everything in memory behind a single async lock and
//! writes a JSON snapshot through on every mutation, before the mutating call
//! returns. A status change is therefore durable by the time the caller goes
//! on to touch the ledger. Mutations are made on a copy of the state which
//! replaces the live state only once written: a failed write changes nothing.
//!
//! # File Structure
//!
//! ```json
//! {
//!   "next_user_id": 3,
//!   "users": [{ "id": 1, "matrix_id": "@alice:matrix.org", ... }],
//!   "records": [{ "user_id": 1, "date": "2025-03-01", "statuses": ["read", "missed", ...] }],
//!   "times": [{ "user_id": 1, "date": "2025-03-01", "times": ["05:00", "12:30", ...] }],
//!   "ledgers": [{ "user_id": 1, "counts": [4, 0, 1, 0, 2], "total": 7 }]
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, error, info};
use tokio::sync::Mutex;

use crate::{
    prayers::{DailyPrayerRecord, DailyPrayerTimes, Prayer, PrayerStatus},
    qazo::{LedgerDelta, QazoLedger},
};

mod loader;
mod user;

pub use crate::store::{
    loader::{Snapshot, StoreLoader, StoredTimes},
    user::{Location, User, UserId},
};

/// Errors raised by the [`Store`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown user {0}")]
    UnknownUser(UserId),
    #[error("{prayer} of {date} is already {status}")]
    AlreadyResolved {
        prayer: Prayer,
        date: NaiveDate,
        status: PrayerStatus,
    },
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Default, Clone)]
struct StoreState {
    next_user_id: i64,
    users: BTreeMap<UserId, User>,
    records: BTreeMap<(UserId, NaiveDate), DailyPrayerRecord>,
    times: BTreeMap<(UserId, NaiveDate), DailyPrayerTimes>,
    ledgers: BTreeMap<UserId, QazoLedger>,
}

impl From<Snapshot> for StoreState {
    fn from(snapshot: Snapshot) -> Self {
        StoreState {
            next_user_id: snapshot.next_user_id,
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            records: snapshot
                .records
                .into_iter()
                .map(|r| ((r.user_id, r.date), r))
                .collect(),
            times: snapshot
                .times
                .into_iter()
                .map(|t| ((t.user_id, t.times.date), t.times))
                .collect(),
            ledgers: snapshot
                .ledgers
                .into_iter()
                .map(|l| (l.user_id, l))
                .collect(),
        }
    }
}

impl StoreState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            next_user_id: self.next_user_id,
            users: self.users.values().cloned().collect(),
            records: self.records.values().cloned().collect(),
            times: self
                .times
                .iter()
                .map(|((user_id, _), times)| StoredTimes {
                    user_id: *user_id,
                    times: times.clone(),
                })
                .collect(),
            ledgers: self.ledgers.values().cloned().collect(),
        }
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut User, StoreError> {
        self.users.get_mut(&id).ok_or(StoreError::UnknownUser(id))
    }

    fn ledger_mut(&mut self, id: UserId) -> &mut QazoLedger {
        self.ledgers
            .entry(id)
            .or_insert_with(|| QazoLedger::new(id))
    }
}

/// Write-through store of every durable entity.
pub struct Store {
    state: Mutex<StoreState>,
    /// `None` for in-memory stores used by tests
    loader: Option<StoreLoader>,
}

impl Store {
    /// Opens the store persisted at `path`, starting empty if the file does
    /// not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: String) -> Result<Self, StoreError> {
        let loader = StoreLoader::new(path);
        let snapshot = loader.load().await?;
        Ok(Store {
            state: Mutex::new(snapshot.into()),
            loader: Some(loader),
        })
    }

    /// Creates a store that is never written to disk.
    pub fn in_memory() -> Self {
        Store {
            state: Mutex::new(StoreState::default()),
            loader: None,
        }
    }

    /// Writes `next` to disk, then installs it as the live state. Called with
    /// the state lock held so snapshots reach the disk in mutation order.
    async fn commit(&self, state: &mut StoreState, next: StoreState) -> Result<(), StoreError> {
        if let Some(loader) = &self.loader {
            loader.persist(&next.snapshot()).await.inspect_err(|e| {
                error!("failed to persist store: {}", e);
            })?;
        }
        *state = next;
        Ok(())
    }

    // Users

    /// Returns the user with the given Matrix id, creating it at `location`
    /// on first contact.
    pub async fn get_or_create_user(
        &self,
        matrix_id: &str,
        room_id: &str,
        location: &Location,
        now: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.values().find(|u| u.matrix_id == matrix_id) {
            return Ok(user.clone());
        }

        let mut next = state.clone();
        next.next_user_id += 1;
        let user = User {
            id: UserId(next.next_user_id),
            matrix_id: matrix_id.to_string(),
            room_id: room_id.to_string(),
            location: location.clone(),
            blocked: false,
            last_activity: now,
        };
        next.users.insert(user.id, user.clone());
        self.commit(&mut state, next).await?;

        info!("registered user {} ({})", user.id, user.matrix_id);
        Ok(user)
    }

    /// Users that are not blocked.
    pub async fn active_users(&self) -> Vec<User> {
        self.state
            .lock()
            .await
            .users
            .values()
            .filter(|u| !u.blocked)
            .cloned()
            .collect()
    }

    /// Records activity of a user: refreshes the activity timestamp and the
    /// reply room, and unblocks the user.
    ///
    /// Returns the updated user and whether it was blocked before.
    pub async fn touch_user(
        &self,
        id: UserId,
        room_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(User, bool), StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let user = next.user_mut(id)?;
        let was_blocked = user.blocked;
        user.blocked = false;
        user.last_activity = now;
        user.room_id = room_id.to_string();
        let user = user.clone();
        self.commit(&mut state, next).await?;

        Ok((user, was_blocked))
    }

    /// Blocks every non blocked user whose last activity is older than
    /// `cutoff` and returns them.
    pub async fn block_inactive(&self, cutoff: DateTime<Utc>) -> Result<Vec<User>, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let blocked = next
            .users
            .values_mut()
            .filter(|u| !u.blocked && u.last_activity < cutoff)
            .map(|u| {
                u.blocked = true;
                u.clone()
            })
            .collect::<Vec<_>>();

        if !blocked.is_empty() {
            self.commit(&mut state, next).await?;
        }
        Ok(blocked)
    }

    pub async fn update_location(
        &self,
        id: UserId,
        location: &Location,
    ) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let user = next.user_mut(id)?;
        user.location = location.clone();
        let user = user.clone();
        self.commit(&mut state, next).await?;
        Ok(user)
    }

    // Daily prayer records

    /// Returns the record of `user` on `date`, creating an all pending one
    /// when missing.
    pub async fn get_or_create_record(
        &self,
        user: UserId,
        date: NaiveDate,
    ) -> Result<DailyPrayerRecord, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(record) = state.records.get(&(user, date)) {
            return Ok(record.clone());
        }

        let record = DailyPrayerRecord::new(user, date);
        let mut next = state.clone();
        next.records.insert((user, date), record.clone());
        self.commit(&mut state, next).await?;

        debug!("created prayer record of user {} on {}", user, date);
        Ok(record)
    }

    pub async fn find_record(&self, user: UserId, date: NaiveDate) -> Option<DailyPrayerRecord> {
        self.state.lock().await.records.get(&(user, date)).cloned()
    }

    /// Moves `prayer` of `user` on `date` out of pending.
    ///
    /// This only persists the status; the ledger increment of a missed
    /// prayer is a separate call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyResolved`] if the prayer already left
    /// the pending state. The record is never overwritten.
    pub async fn set_status(
        &self,
        user: UserId,
        date: NaiveDate,
        prayer: Prayer,
        status: PrayerStatus,
    ) -> Result<DailyPrayerRecord, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let record = next
            .records
            .entry((user, date))
            .or_insert_with(|| DailyPrayerRecord::new(user, date));

        if !record.resolve(prayer, status) {
            return Err(StoreError::AlreadyResolved {
                prayer,
                date,
                status: record.status(prayer),
            });
        }
        let record = record.clone();
        self.commit(&mut state, next).await?;

        info!("{} of user {} on {} is now {}", prayer, user, date, status);
        Ok(record)
    }

    /// Records of `user` strictly before `date` with at least one pending
    /// prayer, oldest first.
    pub async fn open_records_before(
        &self,
        user: UserId,
        date: NaiveDate,
    ) -> Vec<DailyPrayerRecord> {
        self.state
            .lock()
            .await
            .records
            .range((user, NaiveDate::MIN)..(user, date))
            .map(|(_, r)| r)
            .filter(|r| r.has_pending())
            .cloned()
            .collect()
    }

    // Prayer times

    pub async fn times(&self, user: UserId, date: NaiveDate) -> Option<DailyPrayerTimes> {
        self.state.lock().await.times.get(&(user, date)).cloned()
    }

    pub async fn save_times(&self, user: UserId, times: DailyPrayerTimes) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        next.times.insert((user, times.date), times);
        self.commit(&mut state, next).await
    }

    /// Removes the cached times of `user` on `from` and later days. Returns
    /// the number of removed entries.
    pub async fn invalidate_times_from(
        &self,
        user: UserId,
        from: NaiveDate,
    ) -> Result<usize, StoreError> {
        self.remove_times(user, |date| date >= from).await
    }

    /// Removes the cached times of `user` on days before `before`. Returns
    /// the number of removed entries.
    pub async fn prune_times_before(
        &self,
        user: UserId,
        before: NaiveDate,
    ) -> Result<usize, StoreError> {
        self.remove_times(user, |date| date < before).await
    }

    async fn remove_times(
        &self,
        user: UserId,
        remove: impl Fn(NaiveDate) -> bool,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let removed = state
            .times
            .keys()
            .filter(|(owner, date)| *owner == user && remove(*date))
            .count();
        if removed == 0 {
            return Ok(0);
        }

        let mut next = state.clone();
        next.times
            .retain(|(owner, date), _| *owner != user || !remove(*date));
        self.commit(&mut state, next).await?;
        Ok(removed)
    }

    // Qazo ledger

    pub async fn get_or_create_ledger(&self, user: UserId) -> Result<QazoLedger, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(ledger) = state.ledgers.get(&user) {
            return Ok(ledger.clone());
        }
        let mut next = state.clone();
        let ledger = next.ledger_mut(user).clone();
        self.commit(&mut state, next).await?;
        Ok(ledger)
    }

    /// Adds `delta` to the `prayer` counter of `user` and to the total,
    /// clamping at zero.
    pub async fn increment_qazo(
        &self,
        user: UserId,
        prayer: Prayer,
        delta: i64,
    ) -> Result<QazoLedger, StoreError> {
        self.apply_deltas(user, &LedgerDelta::single(prayer, delta))
            .await
    }

    /// Applies every entry of `delta` in a single write.
    pub async fn apply_deltas(
        &self,
        user: UserId,
        delta: &LedgerDelta,
    ) -> Result<QazoLedger, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let ledger = next.ledger_mut(user);
        ledger.apply_delta(delta);
        let ledger = ledger.clone();
        self.commit(&mut state, next).await?;

        info!(
            "qazo of user {} adjusted by [{}], total {}",
            user,
            delta,
            ledger.total()
        );
        Ok(ledger)
    }

    /// Zeroes every counter of `user`.
    pub async fn reset_ledger(&self, user: UserId) -> Result<QazoLedger, StoreError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let ledger = next.ledger_mut(user);
        ledger.reset();
        let ledger = ledger.clone();
        self.commit(&mut state, next).await?;

        info!("qazo of user {} reset", user);
        Ok(ledger)
    }
}
