//! Qazo ledger command handlers: summary, manual adjustments and reset.

use log::debug;

use crate::{
    commands::{
        CommandContext, CommandEffect, CommandResult,
        markdown_response::{format_adjustment, format_ledger, format_reset},
    },
    qazo::{Direction, LedgerDelta},
};

/// Shows the current qazo per prayer.
pub fn handle_summary(context: &CommandContext) -> CommandResult {
    debug!("handling summary command for user {}", context.user.id);

    CommandResult::reply(format_ledger(&context.day.ledger))
}

/// Requests a manual adjustment. The delta was validated while parsing.
pub fn handle_adjust(direction: Direction, delta: LedgerDelta) -> CommandResult {
    debug!("handling adjust command: {}", delta);

    CommandResult::with_effect(
        format_adjustment(direction, &delta),
        CommandEffect::Adjust(direction, delta),
    )
}

pub fn handle_reset() -> CommandResult {
    debug!("handling reset command");

    CommandResult::with_effect(format_reset(), CommandEffect::ResetLedger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        commands::tests::create_test_context,
        prayers::{Prayer, times::tests::hm},
    };

    #[test]
    fn test_handle_summary() {
        let mut context = create_test_context(hm(13, 0));
        context.day.ledger.apply(Prayer::Isha, 2);
        context.day.ledger.apply(Prayer::Fajr, 1);

        let result = handle_summary(&context);

        assert!(result.effect.is_none());
        assert!(result.response.starts_with("Qazo prayers: **3**"));
    }

    #[test]
    fn test_handle_adjust() {
        let delta = LedgerDelta::uniform(-10);

        let result = handle_adjust(Direction::Remove, delta);

        assert_eq!(
            result.effect,
            Some(CommandEffect::Adjust(Direction::Remove, delta))
        );
        assert!(result.response.starts_with("➖ Removed 10 fajr"));
    }

    #[test]
    fn test_handle_reset() {
        let result = handle_reset();

        assert_eq!(result.effect, Some(CommandEffect::ResetLedger));
        assert!(!result.response.is_empty());
    }
}
