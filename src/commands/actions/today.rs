//! Today and times command handlers.
//!
//! Read-only views of the user's current local day.

use log::debug;

use crate::commands::{
    CommandContext, CommandResult,
    markdown_response::{format_times, format_today},
};

/// Lists the status of each prayer of today.
pub fn handle_today(context: &CommandContext) -> CommandResult {
    debug!("handling today command for user {}", context.user.id);

    CommandResult::reply(format_today(&context.day.record, &context.day.times))
}

/// Lists today's prayer times at the user's location.
pub fn handle_times(context: &CommandContext) -> CommandResult {
    debug!("handling times command for user {}", context.user.id);

    CommandResult::reply(format_times(&context.day.times, &context.user.location))
}
