//! Help command handler.
//!
//! Displays help information including all available commands and their
//! syntax. This is a stateless command that always returns the same message.

use log::debug;

use crate::commands::{CommandResult, markdown_response::format_help};

/// Returns formatted help information about available commands.
pub fn handle_help() -> CommandResult {
    debug!("handling help command");

    CommandResult::reply(format_help())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_help() {
        let result = handle_help();

        assert!(result.effect.is_none());
        assert!(!result.response.is_empty());
    }
}
