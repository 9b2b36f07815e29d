//! Reminder escalation engine.
//!
//! # Overview
//!
//! For every active user the engine runs four cadences, each in the user's
//! own timezone:
//!
//! - **fine** (every minute): "time has begun" reminder when a prayer starts
//! - **coarse** (every 10 minutes): "did you pray yet?" for the current
//!   prayer, escalated to "read or missed?" once the next prayer started
//! - **day boundary**: pending prayers of finished days become missed qazo
//! - **inactivity** (hourly): users silent for 48 hours are paused
//!
//! # Tiers
//!
//! ```text
//! pending prayer ─► Announce ─► Pending ─► Missed ─► (day boundary) missed
//!                      │           │          │
//!                      └───────────┴──────────┴─► read / missed action
//! ```
//!
//! A reminder always replaces every live reminder of the same prayer, so a
//! user sees at most one reminder per prayer.

use crate::{prayers::TimesError, store::StoreError};

mod engine;
mod escalation;
mod index;
mod messages;
mod sweep;
mod tier;

pub use crate::reminders::{
    engine::{ActionOutcome, DayView, ReminderEngine, ReminderSettings},
    messages::format_summary,
    tier::Tier,
};

/// Errors that abort the work of a cadence for one user.
///
/// Delivery failures are not part of it: they are logged and retried by the
/// next tick.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Times(#[from] TimesError),
}
