//! Day boundary and inactivity sweeps.

use chrono::NaiveDate;
use futures::future::join_all;
use log::{debug, error, info, warn};

use crate::{
    messaging::Messenger,
    prayers::{Prayer, PrayerStatus, TimeService},
    reminders::{
        ReminderEngine, ReminderError,
        messages::{format_blocked, format_end_of_day},
    },
    store::{StoreError, User},
};

impl<M: Messenger, T: TimeService> ReminderEngine<M, T> {
    /// Force-marks the pending prayers of finished days as missed.
    ///
    /// A day is finished once the user's local date moved past it, or once
    /// the local time reached the day end fallback. Users who had prayers
    /// marked receive a qazo summary.
    pub async fn day_boundary_tick(&self) {
        let users = self.store.active_users().await;
        let results = join_all(users.iter().map(|u| self.day_boundary_user(u))).await;

        for (user, result) in users.iter().zip(results) {
            if let Err(e) = result {
                error!("day boundary sweep failed for user {}: {}", user.id, e);
            }
        }
    }

    async fn day_boundary_user(&self, user: &User) -> Result<(), ReminderError> {
        let _guard = self.index.lock_user(user.id).await;
        let local = self.local_now(user);
        let today = local.date_naive();
        let mut marked = Vec::new();

        if let Some(previous) = self.index.observe_date(user.id, today).await {
            info!(
                "local date of user {} moved from {} to {}",
                user.id, previous, today
            );
        }

        // Every earlier day with pending prayers, not only yesterday: this
        // also catches days left open by a restart
        for record in self.store.open_records_before(user.id, today).await {
            marked.extend(self.sweep_date(user, record.date).await?);
        }
        for handle in self.index.take_before(user.id, today).await {
            self.delete_message(user, &handle).await;
        }
        let pruned = self.store.prune_times_before(user.id, today).await?;
        if pruned > 0 {
            debug!("dropped {} cached prayer times of user {}", pruned, user.id);
        }

        if local.time() >= self.settings.day_end_fallback
            && self.index.mark_swept(user.id, today).await
        {
            info!("day end fallback for user {} on {}", user.id, today);
            marked.extend(self.sweep_date(user, today).await?);
            for handle in self.index.take_date(user.id, today).await {
                self.delete_message(user, &handle).await;
            }
        }

        if !marked.is_empty() {
            self.send_end_of_day(user, &marked).await?;
        }
        Ok(())
    }

    /// Marks every pending prayer of `user` on `date` as missed, each
    /// followed by its ledger increment. Returns the marked prayers.
    async fn sweep_date(&self, user: &User, date: NaiveDate) -> Result<Vec<Prayer>, ReminderError> {
        let record = self.store.get_or_create_record(user.id, date).await?;
        let mut marked = Vec::new();

        for prayer in record.pending().collect::<Vec<_>>() {
            match self
                .store
                .set_status(user.id, date, prayer, PrayerStatus::Missed)
                .await
            {
                Ok(_) => {}
                Err(StoreError::AlreadyResolved { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
            self.store.increment_qazo(user.id, prayer, 1).await?;
            marked.push(prayer);
        }

        if !marked.is_empty() {
            info!(
                "swept {} pending prayers of user {} on {}",
                marked.len(),
                user.id,
                date
            );
        }
        Ok(marked)
    }

    async fn send_end_of_day(&self, user: &User, marked: &[Prayer]) -> Result<(), ReminderError> {
        let ledger = self.store.get_or_create_ledger(user.id).await?;
        let text = format_end_of_day(marked, &ledger.summary());

        if let Err(e) = self.messenger.send(&user.room_id, &text, &[]).await {
            warn!("failed to send end of day summary to user {}: {}", user.id, e);
        }
        Ok(())
    }

    /// Blocks users silent for longer than the inactivity threshold and
    /// notifies each of them once.
    pub async fn inactivity_sweep(&self) {
        let cutoff = self.now() - self.settings.inactivity_threshold;
        let blocked = match self.store.block_inactive(cutoff).await {
            Ok(blocked) => blocked,
            Err(e) => {
                error!("inactivity sweep failed: {}", e);
                return;
            }
        };

        join_all(blocked.iter().map(|u| self.notify_blocked(u))).await;
    }

    async fn notify_blocked(&self, user: &User) {
        info!("user {} blocked after inactivity", user.id);
        let _guard = self.index.lock_user(user.id).await;

        for handle in self.index.take_before(user.id, NaiveDate::MAX).await {
            self.delete_message(user, &handle).await;
        }
        if let Err(e) = self.messenger.send(&user.room_id, &format_blocked(), &[]).await {
            warn!("failed to notify blocked user {}: {}", user.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::{
        messaging::ActionKind,
        prayers::{Prayer, PrayerStatus},
        reminders::engine::tests::{at, date, harness},
    };

    #[tokio::test]
    async fn test_date_change_sweeps_previous_day() {
        let h = harness(at(1, 12, 40)).await;
        h.engine.day_boundary_tick().await;
        h.engine.coarse_tick().await;
        h.engine
            .on_action(&h.user, Prayer::Fajr, ActionKind::Read)
            .await
            .unwrap();
        h.messenger.clear();

        h.clock.set(at(2, 0, 1));
        h.engine.day_boundary_tick().await;

        let record = h.store.find_record(h.user.id, date(1)).await.unwrap();
        assert!(!record.has_pending());
        assert_eq!(record.status(Prayer::Fajr), PrayerStatus::Read);
        assert_eq!(record.status(Prayer::Isha), PrayerStatus::Missed);

        let ledger = h.store.get_or_create_ledger(h.user.id).await.unwrap();
        assert_eq!(ledger.total(), 4);
        assert_eq!(ledger.count(Prayer::Fajr), 0);

        // The dhuhr reminder of the previous day was deleted
        assert_eq!(h.messenger.deleted().len(), 1);
        assert_eq!(h.messenger.live().len(), 1);
        let summary = &h.messenger.sent()[0];
        assert!(summary.text.contains("Qazo prayers: **4**"));
        assert_eq!(h.engine.index.live_count(h.user.id).await, 0);
    }

    #[tokio::test]
    async fn test_sweep_catches_days_left_open_by_restart() {
        let h = harness(at(1, 9, 0)).await;
        h.store.get_or_create_record(h.user.id, date(1)).await.unwrap();
        h.store.get_or_create_record(h.user.id, date(2)).await.unwrap();

        // First observation ever happens days later
        h.clock.set(at(3, 8, 0));
        h.engine.day_boundary_tick().await;

        let ledger = h.store.get_or_create_ledger(h.user.id).await.unwrap();
        assert_eq!(ledger.total(), 10);
        assert!(h.store.open_records_before(h.user.id, date(3)).await.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_sweeps_today_once() {
        let h = harness(at(1, 23, 58)).await;
        h.engine.coarse_tick().await;
        h.engine.day_boundary_tick().await;
        assert_eq!(
            h.store.get_or_create_ledger(h.user.id).await.unwrap().total(),
            0
        );

        h.clock.set(at(1, 23, 59));
        h.engine.day_boundary_tick().await;
        h.engine.day_boundary_tick().await;

        let record = h.store.find_record(h.user.id, date(1)).await.unwrap();
        assert!(!record.has_pending());
        let ledger = h.store.get_or_create_ledger(h.user.id).await.unwrap();
        assert_eq!(ledger.total(), 5);

        let summaries = h
            .messenger
            .sent()
            .into_iter()
            .filter(|s| s.text.contains("The day is over"))
            .count();
        assert_eq!(summaries, 1);
        assert!(h.messenger.live().iter().all(|s| s.actions.is_empty()));

        // Crossing midnight afterwards has nothing left to sweep
        h.clock.set(at(2, 0, 1));
        h.engine.day_boundary_tick().await;
        let ledger = h.store.get_or_create_ledger(h.user.id).await.unwrap();
        assert_eq!(ledger.total(), 5);
    }

    #[tokio::test]
    async fn test_day_boundary_drops_past_prayer_times() {
        let h = harness(at(1, 9, 0)).await;

        for day in 1..=4 {
            h.clock.set(at(day, 9, 0));
            h.engine.coarse_tick().await;
            h.engine.day_boundary_tick().await;
        }

        for day in 1..=3 {
            assert!(h.store.times(h.user.id, date(day)).await.is_none());
        }
        assert!(h.store.times(h.user.id, date(4)).await.is_some());
    }

    #[tokio::test]
    async fn test_nothing_marked_sends_no_summary() {
        let h = harness(at(1, 9, 0)).await;
        h.engine.day_boundary_tick().await;

        h.clock.set(at(2, 0, 1));
        h.engine.day_boundary_tick().await;

        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_inactivity_blocks_and_notifies_once() {
        let h = harness(at(1, 9, 0)).await;
        h.engine.coarse_tick().await;
        h.messenger.clear();

        // Last activity is 2025-03-01 00:00 UTC
        h.clock.set(h.user.last_activity + Duration::hours(47));
        h.engine.inactivity_sweep().await;
        assert_eq!(h.store.active_users().await.len(), 1);

        h.clock.set(h.user.last_activity + Duration::hours(49));
        h.engine.inactivity_sweep().await;
        h.engine.inactivity_sweep().await;

        assert!(h.store.active_users().await.is_empty());
        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("48 hours"));
        assert_eq!(h.engine.index.live_count(h.user.id).await, 0);
    }

    #[tokio::test]
    async fn test_blocked_users_are_skipped_by_cadences() {
        let h = harness(at(1, 12, 40)).await;
        h.store.block_inactive(at(1, 12, 40)).await.unwrap();

        h.engine.fine_tick().await;
        h.engine.coarse_tick().await;
        h.clock.set(at(2, 0, 1));
        h.engine.day_boundary_tick().await;

        assert!(h.messenger.sent().is_empty());
        assert!(h.store.find_record(h.user.id, date(1)).await.is_none());
    }
}
