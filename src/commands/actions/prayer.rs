//! Reminder action handler.
//!
//! Answers to reminders (`read`, `missed`, `later`) are checked against the
//! user's current day before reaching the engine:
//!
//! - a prayer that has not started yet can not be answered, unless its
//!   first reminder already went out
//! - a prayer that already left pending is reported as is

use log::debug;

use crate::{
    commands::{
        CommandContext, CommandEffect, CommandResult,
        markdown_response::{format_action_outcome, format_not_started},
    },
    messaging::PrayerAction,
    reminders::ActionOutcome,
};

/// Validates a reminder action and requests it from the engine.
pub fn handle_prayer(context: &CommandContext, action: PrayerAction) -> CommandResult {
    debug!("handling prayer action: {}", action);

    let CommandContext { user: _, day } = context;
    let prayer = action.prayer;

    if !day.has_started(prayer) {
        debug!("{} has not started yet at {}", prayer, day.now);
        return CommandResult::reply(format_not_started(prayer));
    }

    if !day.record.is_pending(prayer) {
        let outcome = ActionOutcome::AlreadyResolved {
            prayer,
            status: day.record.status(prayer),
        };
        return CommandResult::reply(format_action_outcome(&outcome));
    }

    CommandResult::with_effect(String::new(), CommandEffect::Prayer(action))
}
