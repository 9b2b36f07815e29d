//! Process local index of the reminders currently visible to users.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::NaiveDate;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{messaging::MessageHandle, prayers::Prayer, reminders::Tier, store::UserId};

/// Identifies the reminders of one prayer of one user on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReminderKey {
    pub user: UserId,
    pub prayer: Prayer,
    pub date: NaiveDate,
}

impl ReminderKey {
    pub fn new(user: UserId, prayer: Prayer, date: NaiveDate) -> Self {
        ReminderKey { user, prayer, date }
    }
}

#[derive(Default)]
struct IndexState {
    /// One map per [`Tier`], indexed by [`Tier::index`]
    handles: [HashMap<ReminderKey, MessageHandle>; 3],
    /// Keys whose "time has begun" reminder was already sent
    announced: HashSet<ReminderKey>,
    /// Last local date each user was seen at by the day boundary cadence
    last_seen: HashMap<UserId, NaiveDate>,
    /// Days already swept by the fixed time fallback
    swept: HashSet<(UserId, NaiveDate)>,
}

impl IndexState {
    fn drain_where<F>(&mut self, matches: F) -> Vec<MessageHandle>
    where
        F: Fn(&ReminderKey) -> bool,
    {
        let mut removed = Vec::new();
        for map in self.handles.iter_mut() {
            let keys = map.keys().filter(|k| matches(k)).copied().collect::<Vec<_>>();
            removed.extend(keys.iter().filter_map(|k| map.remove(k)));
        }
        self.announced.retain(|k| !matches(k));
        removed
    }
}

/// In-flight reminder handles and per user locks.
///
/// Holds at most one handle per tier and key. The engine deletes every
/// handle of a key before storing a new one, so a user never sees two live
/// reminders for the same prayer. Nothing here is persisted: after a restart
/// the coarse cadence sends fresh reminders.
#[derive(Default)]
pub struct ReminderIndex {
    state: Mutex<IndexState>,
    locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl ReminderIndex {
    pub fn new() -> Self {
        ReminderIndex::default()
    }

    /// Acquires the lock serializing every unit of work on `user`.
    pub async fn lock_user(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(user).or_default())
        };
        lock.lock_owned().await
    }

    /// Removes and returns every handle of `key`, across all tiers.
    pub async fn take_all(&self, key: &ReminderKey) -> Vec<(Tier, MessageHandle)> {
        let mut state = self.state.lock().await;
        Tier::ALL
            .into_iter()
            .filter_map(|tier| state.handles[tier.index()].remove(key).map(|h| (tier, h)))
            .collect()
    }

    pub async fn store(&self, key: ReminderKey, tier: Tier, handle: MessageHandle) {
        self.state.lock().await.handles[tier.index()].insert(key, handle);
    }

    #[cfg(test)]
    pub async fn handle(&self, key: &ReminderKey, tier: Tier) -> Option<MessageHandle> {
        self.state.lock().await.handles[tier.index()].get(key).cloned()
    }

    /// Tier of the live reminder of `key`, if any.
    pub async fn live_tier(&self, key: &ReminderKey) -> Option<Tier> {
        let state = self.state.lock().await;
        Tier::ALL
            .into_iter()
            .find(|tier| state.handles[tier.index()].contains_key(key))
    }

    pub async fn is_announced(&self, key: &ReminderKey) -> bool {
        self.state.lock().await.announced.contains(key)
    }

    pub async fn mark_announced(&self, key: ReminderKey) {
        self.state.lock().await.announced.insert(key);
    }

    /// Clears every handle and marker of `user` on `date`.
    pub async fn take_date(&self, user: UserId, date: NaiveDate) -> Vec<MessageHandle> {
        self.state
            .lock()
            .await
            .drain_where(|k| k.user == user && k.date == date)
    }

    /// Clears every handle and marker of `user` on days before `date`.
    pub async fn take_before(&self, user: UserId, date: NaiveDate) -> Vec<MessageHandle> {
        let mut state = self.state.lock().await;
        state.swept.retain(|(u, d)| *u != user || *d >= date);
        state.drain_where(|k| k.user == user && k.date < date)
    }

    /// Records that `user` is now on local `date`.
    ///
    /// Returns the previously seen date when it differs, `None` on the first
    /// observation or when the date did not change.
    pub async fn observe_date(&self, user: UserId, date: NaiveDate) -> Option<NaiveDate> {
        let mut state = self.state.lock().await;
        match state.last_seen.insert(user, date) {
            Some(previous) if previous != date => Some(previous),
            _ => None,
        }
    }

    /// Marks the fallback sweep of `user` on `date` as done. Returns `false`
    /// if it already was.
    pub async fn mark_swept(&self, user: UserId, date: NaiveDate) -> bool {
        self.state.lock().await.swept.insert((user, date))
    }

    /// Number of live handles of `user`, all tiers and days together.
    #[cfg(test)]
    pub async fn live_count(&self, user: UserId) -> usize {
        let state = self.state.lock().await;
        state
            .handles
            .iter()
            .map(|m| m.keys().filter(|k| k.user == user).count())
            .sum()
    }
}
