//! The reminder engine: fine and coarse cadences, user actions and ledger
//! adjustments.
//!
//! Every unit of work on a user holds that user's lock from the
//! [`ReminderIndex`], which makes each send-or-replace atomic for its key and
//! orders actions against ticks.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use log::{debug, error, info, warn};

use crate::{
    clock::Clock,
    messaging::{ActionKind, DeleteOutcome, MessageHandle, Messenger, PrayerAction},
    prayers::{
        DailyPrayerRecord, DailyPrayerTimes, Prayer, PrayerStatus, PrayerTimesCache, TimeService,
    },
    qazo::{LedgerDelta, QazoLedger},
    reminders::{
        ReminderError, Tier,
        escalation::{due_announcements, pending_escalations},
        index::{ReminderIndex, ReminderKey},
        messages::format_reminder,
    },
    store::{Location, Store, StoreError, User},
};

/// Tunable thresholds of the engine.
#[derive(Debug, Clone)]
pub struct ReminderSettings {
    /// Distance to a prayer time within which the "time has begun" reminder
    /// is sent
    pub tolerance: Duration,
    /// End of the isha window
    pub day_end_cutoff: NaiveTime,
    /// Local time after which the current day is swept
    pub day_end_fallback: NaiveTime,
    /// Silence after which a user is blocked
    pub inactivity_threshold: Duration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        ReminderSettings {
            tolerance: Duration::minutes(2),
            day_end_cutoff: NaiveTime::from_hms_opt(23, 40, 0).unwrap_or(NaiveTime::MIN),
            day_end_fallback: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
            inactivity_threshold: Duration::hours(48),
        }
    }
}

/// Result of a user action on a prayer.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The prayer moved out of pending. `ledger` is the updated ledger when
    /// the prayer was marked missed.
    Marked {
        prayer: Prayer,
        status: PrayerStatus,
        ledger: Option<QazoLedger>,
    },
    /// Nothing changed, the next coarse tick reminds again.
    Deferred(Prayer),
    /// The prayer had already left pending, nothing changed.
    AlreadyResolved { prayer: Prayer, status: PrayerStatus },
}

/// What a user's current local day looks like.
#[derive(Debug, Clone)]
pub struct DayView {
    pub date: NaiveDate,
    pub now: NaiveTime,
    pub record: DailyPrayerRecord,
    pub times: DailyPrayerTimes,
    pub ledger: QazoLedger,
    /// How long before its time a prayer is announced
    pub tolerance: Duration,
}

impl DayView {
    /// Whether `prayer` can be answered now: from its first reminder on,
    /// which may precede the prayer time by the tolerance.
    pub fn has_started(&self, prayer: Prayer) -> bool {
        self.now.signed_duration_since(self.times.time(prayer)) >= -self.tolerance
    }
}

/// Decides and performs reminder sends, replacements and deletions.
pub struct ReminderEngine<M: Messenger, T: TimeService> {
    pub(super) messenger: Arc<M>,
    pub(super) store: Arc<Store>,
    pub(super) times: PrayerTimesCache<T>,
    pub(super) index: ReminderIndex,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) settings: ReminderSettings,
}

/// Actions attached to a reminder of `tier`.
fn actions_for(prayer: Prayer, tier: Tier) -> Vec<PrayerAction> {
    match tier {
        Tier::Announce | Tier::Pending => vec![PrayerAction::new(prayer, ActionKind::Read)],
        Tier::Missed => vec![
            PrayerAction::new(prayer, ActionKind::Read),
            PrayerAction::new(prayer, ActionKind::Missed),
        ],
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

impl<M: Messenger, T: TimeService> ReminderEngine<M, T> {
    pub fn new(
        messenger: Arc<M>,
        store: Arc<Store>,
        time_service: T,
        clock: Arc<dyn Clock>,
        settings: ReminderSettings,
    ) -> Self {
        ReminderEngine {
            messenger,
            times: PrayerTimesCache::new(time_service, Arc::clone(&store)),
            store,
            index: ReminderIndex::new(),
            clock,
            settings,
        }
    }

    pub(super) fn local_now(&self, user: &User) -> DateTime<Tz> {
        self.clock.now().with_timezone(&user.timezone())
    }

    pub(super) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sends the "time has begun" reminder of every prayer starting around
    /// now, at most once per prayer and day.
    pub async fn fine_tick(&self) {
        let users = self.store.active_users().await;
        let results = join_all(users.iter().map(|u| self.fine_tick_user(u))).await;

        for (user, result) in users.iter().zip(results) {
            if let Err(e) = result {
                error!("fine tick failed for user {}: {}", user.id, e);
            }
        }
    }

    async fn fine_tick_user(&self, user: &User) -> Result<(), ReminderError> {
        let _guard = self.index.lock_user(user.id).await;
        let local = self.local_now(user);
        let date = local.date_naive();
        let now = truncate_to_minute(local.time());

        let times = self.times.get_or_compute(user, date).await?;
        let record = self.store.get_or_create_record(user.id, date).await?;

        for prayer in due_announcements(&times, &record, now, self.settings.tolerance) {
            let key = ReminderKey::new(user.id, prayer, date);
            if self.index.is_announced(&key).await {
                continue;
            }
            if let Some(tier) = self.index.live_tier(&key).await {
                debug!("{} of user {} already reminded at tier {}", prayer, user.id, tier);
                self.index.mark_announced(key).await;
                continue;
            }
            if self.replace_reminder(user, key, Tier::Announce).await {
                self.index.mark_announced(key).await;
            }
        }
        Ok(())
    }

    /// Sends or replaces the reminder of every passed pending prayer at the
    /// tier it deserves now.
    pub async fn coarse_tick(&self) {
        let users = self.store.active_users().await;
        let results = join_all(users.iter().map(|u| self.coarse_tick_user(u))).await;

        for (user, result) in users.iter().zip(results) {
            if let Err(e) = result {
                error!("coarse tick failed for user {}: {}", user.id, e);
            }
        }
    }

    async fn coarse_tick_user(&self, user: &User) -> Result<(), ReminderError> {
        let _guard = self.index.lock_user(user.id).await;
        let local = self.local_now(user);
        let date = local.date_naive();
        let now = truncate_to_minute(local.time());

        let times = self.times.get_or_compute(user, date).await?;
        let record = self.store.get_or_create_record(user.id, date).await?;

        for (prayer, tier) in pending_escalations(&times, &record, now, self.settings.day_end_cutoff)
        {
            debug!("{} of user {} is at tier {}", prayer, user.id, tier);
            self.replace_reminder(user, ReminderKey::new(user.id, prayer, date), tier)
                .await;
        }
        Ok(())
    }

    /// Deletes every live reminder of `key` then sends a new one at `tier`.
    ///
    /// Returns whether the new reminder was sent. Failures are logged; the
    /// next tick is the retry.
    async fn replace_reminder(&self, user: &User, key: ReminderKey, tier: Tier) -> bool {
        self.clear_reminders(user, &key).await;

        let text = format_reminder(key.prayer, tier);
        match self
            .messenger
            .send(&user.room_id, &text, &actions_for(key.prayer, tier))
            .await
        {
            Ok(handle) => {
                debug!(
                    "sent {} reminder of {} to user {}: {}",
                    tier, key.prayer, user.id, handle
                );
                self.index.store(key, tier, handle).await;
                true
            }
            Err(e) => {
                warn!(
                    "failed to send {} reminder of {} to user {}: {}",
                    tier, key.prayer, user.id, e
                );
                false
            }
        }
    }

    /// Deletes every live reminder of `key`, all tiers.
    async fn clear_reminders(&self, user: &User, key: &ReminderKey) {
        for (_, handle) in self.index.take_all(key).await {
            self.delete_message(user, &handle).await;
        }
    }

    pub(super) async fn delete_message(&self, user: &User, handle: &MessageHandle) {
        match self.messenger.delete(&user.room_id, handle).await {
            Ok(DeleteOutcome::Deleted) => debug!("deleted message {} of user {}", handle, user.id),
            Ok(DeleteOutcome::AlreadyGone) => {
                debug!("message {} of user {} was already gone", handle, user.id)
            }
            Err(e) => warn!("{}", e),
        }
    }

    /// Applies a user action on `prayer` of the user's current local day.
    ///
    /// Read and missed delete every reminder of the prayer first, then
    /// persist the status, then for missed increment the ledger.
    pub async fn on_action(
        &self,
        user: &User,
        prayer: Prayer,
        kind: ActionKind,
    ) -> Result<ActionOutcome, ReminderError> {
        let _guard = self.index.lock_user(user.id).await;
        let date = self.local_now(user).date_naive();

        let status = match kind {
            ActionKind::Read => PrayerStatus::Read,
            ActionKind::Missed => PrayerStatus::Missed,
            ActionKind::Later => {
                debug!("user {} deferred {}", user.id, prayer);
                return Ok(ActionOutcome::Deferred(prayer));
            }
        };

        let record = self.store.get_or_create_record(user.id, date).await?;
        if !record.is_pending(prayer) {
            return Ok(ActionOutcome::AlreadyResolved {
                prayer,
                status: record.status(prayer),
            });
        }

        self.clear_reminders(user, &ReminderKey::new(user.id, prayer, date))
            .await;

        match self.store.set_status(user.id, date, prayer, status).await {
            Ok(_) => {}
            Err(StoreError::AlreadyResolved { status, .. }) => {
                return Ok(ActionOutcome::AlreadyResolved { prayer, status });
            }
            Err(e) => return Err(e.into()),
        }

        let ledger = match status {
            PrayerStatus::Missed => Some(self.store.increment_qazo(user.id, prayer, 1).await?),
            _ => None,
        };

        Ok(ActionOutcome::Marked {
            prayer,
            status,
            ledger,
        })
    }

    /// Returns the user for `matrix_id`, creating it at `default_location` on
    /// first contact, and records its activity.
    ///
    /// Returns whether the user was blocked before this call.
    pub async fn register_activity(
        &self,
        matrix_id: &str,
        room_id: &str,
        default_location: &Location,
    ) -> Result<(User, bool), ReminderError> {
        let now = self.now();
        let user = self
            .store
            .get_or_create_user(matrix_id, room_id, default_location, now)
            .await?;
        let (user, was_blocked) = self.store.touch_user(user.id, room_id, now).await?;

        if was_blocked {
            info!("user {} is active again", user.id);
        }
        Ok((user, was_blocked))
    }

    /// Current local day of `user`: statuses, times and ledger.
    pub async fn day_view(&self, user: &User) -> Result<DayView, ReminderError> {
        let local = self.local_now(user);
        let date = local.date_naive();

        Ok(DayView {
            date,
            now: truncate_to_minute(local.time()),
            record: self.store.get_or_create_record(user.id, date).await?,
            times: self.times.get_or_compute(user, date).await?,
            ledger: self.store.get_or_create_ledger(user.id).await?,
            tolerance: self.settings.tolerance,
        })
    }

    /// Applies a manual ledger adjustment.
    pub async fn adjust_ledger(
        &self,
        user: &User,
        delta: &LedgerDelta,
    ) -> Result<QazoLedger, ReminderError> {
        let _guard = self.index.lock_user(user.id).await;
        Ok(self.store.apply_deltas(user.id, delta).await?)
    }

    pub async fn reset_ledger(&self, user: &User) -> Result<QazoLedger, ReminderError> {
        let _guard = self.index.lock_user(user.id).await;
        Ok(self.store.reset_ledger(user.id).await?)
    }

    /// Moves `user` to `location` and drops the cached times from its current
    /// local date onward.
    pub async fn relocate(&self, user: &User, location: &Location) -> Result<User, ReminderError> {
        let _guard = self.index.lock_user(user.id).await;

        // The earliest of both local dates, so no day that is still today
        // somewhere keeps stale times
        let old_date = self.local_now(user).date_naive();
        let updated = self.store.update_location(user.id, location).await?;
        let new_date = self.local_now(&updated).date_naive();

        self.times
            .invalidate_from(&updated, old_date.min(new_date))
            .await?;
        info!(
            "user {} moved to {} ({})",
            updated.id, location.city, location.timezone
        );
        Ok(updated)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::{
        clock::ManualClock,
        messaging::{MockMessenger, MessagingError, RecordingMessenger},
        prayers::{MockTimeService, times::tests::sample_times},
        store::tests::create_test_user,
    };

    pub type TestEngine = ReminderEngine<RecordingMessenger, MockTimeService>;

    /// Tashkent local time on March `day`, 2025.
    pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        chrono_tz::Asia::Tashkent
            .with_ymd_and_hms(2025, 3, day, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    pub fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    pub fn time_service() -> MockTimeService {
        let mut service = MockTimeService::new();
        service
            .expect_compute_times()
            .returning(|d, _, _, _| Ok(sample_times(d)));
        service
    }

    pub struct Harness {
        pub engine: TestEngine,
        pub messenger: Arc<RecordingMessenger>,
        pub store: Arc<Store>,
        pub clock: Arc<ManualClock>,
        pub user: User,
    }

    pub async fn harness(now: DateTime<Utc>) -> Harness {
        let messenger = Arc::new(RecordingMessenger::new());
        let store = Arc::new(Store::in_memory());
        let clock = Arc::new(ManualClock::new(now));
        let user = create_test_user(&store, "@alice:example.com").await;
        let engine = ReminderEngine::new(
            Arc::clone(&messenger),
            Arc::clone(&store),
            time_service(),
            clock.clone(),
            ReminderSettings::default(),
        );

        Harness {
            engine,
            messenger,
            store,
            clock,
            user,
        }
    }

    fn key(prayer: Prayer, day: u32) -> ReminderKey {
        ReminderKey::new(crate::store::UserId(1), prayer, date(day))
    }

    #[tokio::test]
    async fn test_fine_tick_announces_prayer_once() {
        let h = harness(at(1, 5, 1)).await;

        h.engine.fine_tick().await;
        h.clock.set(at(1, 5, 2));
        h.engine.fine_tick().await;

        let sent = h.messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Fajr"));
        assert_eq!(
            sent[0].actions,
            vec![PrayerAction::new(Prayer::Fajr, ActionKind::Read)]
        );
        assert_eq!(sent[0].recipient, "!room:example.com");
        assert_eq!(
            h.engine.index.live_tier(&key(Prayer::Fajr, 1)).await,
            Some(Tier::Announce)
        );
    }

    #[tokio::test]
    async fn test_fine_tick_outside_tolerance_sends_nothing() {
        let h = harness(at(1, 6, 0)).await;

        h.engine.fine_tick().await;

        assert!(h.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_announce_is_not_resent_after_replacement() {
        let h = harness(at(1, 5, 0)).await;

        h.engine.fine_tick().await;
        h.clock.set(at(1, 5, 1));
        h.engine.coarse_tick().await;
        h.clock.set(at(1, 5, 2));
        h.engine.fine_tick().await;

        let live = h.messenger.live();
        assert_eq!(live.len(), 1);
        assert_eq!(
            h.engine.index.live_tier(&key(Prayer::Fajr, 1)).await,
            Some(Tier::Pending)
        );
    }

    #[tokio::test]
    async fn test_fine_tick_never_steps_back_a_tier() {
        // The coarse tick lands on fajr time, before any fine tick
        let h = harness(at(1, 5, 0)).await;
        h.engine.coarse_tick().await;

        h.clock.set(at(1, 5, 1));
        h.engine.fine_tick().await;
        h.clock.set(at(1, 5, 2));
        h.engine.fine_tick().await;

        assert_eq!(h.messenger.sent().len(), 1);
        assert!(h.messenger.deleted().is_empty());
        assert_eq!(
            h.engine.index.live_tier(&key(Prayer::Fajr, 1)).await,
            Some(Tier::Pending)
        );
    }

    #[tokio::test]
    async fn test_coarse_tick_escalates_after_next_prayer() {
        let h = harness(at(1, 5, 1)).await;
        h.engine.fine_tick().await;

        h.clock.set(at(1, 12, 40));
        h.engine.coarse_tick().await;

        let live = h.messenger.live();
        assert_eq!(live.len(), 2);
        assert_eq!(
            h.engine.index.live_tier(&key(Prayer::Fajr, 1)).await,
            Some(Tier::Missed)
        );
        assert_eq!(
            h.engine.index.live_tier(&key(Prayer::Dhuhr, 1)).await,
            Some(Tier::Pending)
        );
        let fajr = live.iter().find(|s| s.text.contains("Fajr")).unwrap();
        assert_eq!(
            fajr.actions,
            vec![
                PrayerAction::new(Prayer::Fajr, ActionKind::Read),
                PrayerAction::new(Prayer::Fajr, ActionKind::Missed),
            ]
        );
        // The announce reminder was deleted before escalating
        assert_eq!(h.messenger.deleted().len(), 1);
    }

    #[tokio::test]
    async fn test_coarse_tick_keeps_one_live_reminder_per_prayer() {
        let h = harness(at(1, 12, 40)).await;

        for minutes in [0, 10, 20, 30] {
            h.clock.set(at(1, 12, 40) + Duration::minutes(minutes));
            h.engine.coarse_tick().await;
        }

        assert_eq!(h.messenger.sent().len(), 8);
        assert_eq!(h.messenger.live().len(), 2);
        assert_eq!(h.engine.index.live_count(h.user.id).await, 2);
    }

    #[tokio::test]
    async fn test_missed_action_clears_reminders_and_increments_ledger() {
        let h = harness(at(1, 12, 40)).await;
        h.engine.coarse_tick().await;

        h.clock.set(at(1, 12, 41));
        let outcome = h
            .engine
            .on_action(&h.user, Prayer::Fajr, ActionKind::Missed)
            .await
            .unwrap();

        let ActionOutcome::Marked { status, ledger, .. } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(status, PrayerStatus::Missed);
        assert_eq!(ledger.unwrap().count(Prayer::Fajr), 1);
        assert!(h.engine.index.live_tier(&key(Prayer::Fajr, 1)).await.is_none());
        assert_eq!(h.messenger.live().len(), 1);

        let record = h.store.find_record(h.user.id, date(1)).await.unwrap();
        assert_eq!(record.status(Prayer::Fajr), PrayerStatus::Missed);
    }

    #[tokio::test]
    async fn test_action_on_resolved_prayer_changes_nothing() {
        let h = harness(at(1, 12, 41)).await;
        h.engine
            .on_action(&h.user, Prayer::Fajr, ActionKind::Missed)
            .await
            .unwrap();

        let outcome = h
            .engine
            .on_action(&h.user, Prayer::Fajr, ActionKind::Missed)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ActionOutcome::AlreadyResolved {
                prayer: Prayer::Fajr,
                status: PrayerStatus::Missed
            }
        );
        let ledger = h.store.get_or_create_ledger(h.user.id).await.unwrap();
        assert_eq!(ledger.total(), 1);
    }

    #[tokio::test]
    async fn test_read_action_does_not_touch_ledger() {
        let h = harness(at(1, 5, 10)).await;

        let outcome = h
            .engine
            .on_action(&h.user, Prayer::Fajr, ActionKind::Read)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ActionOutcome::Marked {
                status: PrayerStatus::Read,
                ledger: None,
                ..
            }
        ));
        let ledger = h.store.get_or_create_ledger(h.user.id).await.unwrap();
        assert_eq!(ledger.total(), 0);
    }

    #[tokio::test]
    async fn test_later_action_keeps_reminders() {
        let h = harness(at(1, 5, 10)).await;
        h.engine.coarse_tick().await;

        let outcome = h
            .engine
            .on_action(&h.user, Prayer::Fajr, ActionKind::Later)
            .await
            .unwrap();

        assert_eq!(outcome, ActionOutcome::Deferred(Prayer::Fajr));
        assert_eq!(h.messenger.live().len(), 1);
        let record = h.store.get_or_create_record(h.user.id, date(1)).await.unwrap();
        assert!(record.is_pending(Prayer::Fajr));
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_next_tick() {
        let h = harness(at(1, 5, 0)).await;
        h.messenger.fail_sends(true);

        h.engine.fine_tick().await;
        assert!(!h.engine.index.is_announced(&key(Prayer::Fajr, 1)).await);

        h.messenger.fail_sends(false);
        h.clock.set(at(1, 5, 1));
        h.engine.fine_tick().await;

        assert_eq!(h.messenger.sent().len(), 1);
        assert!(h.engine.index.is_announced(&key(Prayer::Fajr, 1)).await);
    }

    #[tokio::test]
    async fn test_replace_survives_failed_delete() {
        let store = Arc::new(Store::in_memory());
        create_test_user(&store, "@alice:example.com").await;

        let mut messenger = MockMessenger::new();
        let mut sequence = mockall::Sequence::new();
        messenger
            .expect_send()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| Ok(MessageHandle("$first".to_string())));
        messenger
            .expect_delete()
            .withf(|_, handle| handle.0 == "$first")
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|recipient, handle| {
                Err(MessagingError::Delete {
                    recipient: recipient.to_string(),
                    handle: handle.clone(),
                    reason: "timeout".to_string(),
                })
            });
        messenger
            .expect_send()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _, _| Ok(MessageHandle("$second".to_string())));

        let clock = Arc::new(ManualClock::new(at(1, 5, 10)));
        let engine = ReminderEngine::new(
            Arc::new(messenger),
            Arc::clone(&store),
            time_service(),
            clock,
            ReminderSettings::default(),
        );

        engine.coarse_tick().await;
        engine.coarse_tick().await;

        assert_eq!(
            engine.index.handle(&key(Prayer::Fajr, 1), Tier::Pending).await,
            Some(MessageHandle("$second".to_string()))
        );
    }

    #[tokio::test]
    async fn test_relocate_invalidates_cached_times() {
        let messenger = Arc::new(RecordingMessenger::new());
        let store = Arc::new(Store::in_memory());
        let user = create_test_user(&store, "@alice:example.com").await;

        let mut service = MockTimeService::new();
        service
            .expect_compute_times()
            .times(2)
            .returning(|d, _, _, _| Ok(sample_times(d)));

        let engine = ReminderEngine::new(
            messenger,
            Arc::clone(&store),
            service,
            Arc::new(ManualClock::new(at(1, 9, 0))),
            ReminderSettings::default(),
        );
        engine.day_view(&user).await.unwrap();

        let samarkand = Location {
            city: "Samarqand".to_string(),
            country: "Uzbekistan".to_string(),
            timezone: chrono_tz::Asia::Samarkand,
            latitude: 39.6542,
            longitude: 66.9597,
        };
        let moved = engine.relocate(&user, &samarkand).await.unwrap();
        engine.day_view(&moved).await.unwrap();

        assert_eq!(moved.location.city, "Samarqand");
    }

    #[tokio::test]
    async fn test_register_activity_creates_then_unblocks() {
        let h = harness(at(1, 9, 0)).await;
        let location = h.user.location.clone();

        let (bob, was_blocked) = h
            .engine
            .register_activity("@bob:example.com", "!bob:example.com", &location)
            .await
            .unwrap();
        assert!(!was_blocked);
        assert_eq!(bob.room_id, "!bob:example.com");

        h.store.block_inactive(at(1, 10, 0)).await.unwrap();
        h.clock.set(at(1, 11, 0));
        let (bob, was_blocked) = h
            .engine
            .register_activity("@bob:example.com", "!bob:example.com", &location)
            .await
            .unwrap();

        assert!(was_blocked);
        assert!(!bob.blocked);
        assert_eq!(bob.last_activity, at(1, 11, 0));
    }

    #[tokio::test]
    async fn test_adjust_and_reset_ledger() {
        let h = harness(at(1, 9, 0)).await;

        let ledger = h
            .engine
            .adjust_ledger(&h.user, &LedgerDelta::uniform(3))
            .await
            .unwrap();
        assert_eq!(ledger.total(), 15);

        let ledger = h.engine.reset_ledger(&h.user).await.unwrap();
        assert_eq!(ledger.total(), 0);
    }
}
