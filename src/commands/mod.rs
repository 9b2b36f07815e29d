//! Bot command parsing and response formatting.
//!
//! This module is the inbound side of the bot: it turns Matrix messages into
//! requests for the reminder engine and formats the replies.
//!
//! # Overview
//!
//! 1. **Parsing** - Converting Matrix messages into structured [`command::Command`] enums
//! 2. **Validation** - Ensuring commands have correct syntax and valid arguments
//! 3. **Execution** - Routing commands to specialized handlers
//! 4. **Response** - Formatting results as Markdown for Matrix display
//!
//! # Architecture
//!
//! ```text
//! Matrix Message
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Commander  │  ← Entry point: parse() + execute()
//! └─────────────┘
//!      │
//!      └── execute() ─────────────────┐
//!                                     ▼
//!                          ┌─────────────────────┐
//!                          │ Action Handlers     │
//!                          │  - handle_help      │
//!                          │  - handle_prayer    │
//!                          │  - handle_today     │
//!                          │  - handle_summary   │
//!                          │  - handle_location  │
//!                          └─────────────────────┘
//!                                     │
//!                                     ▼
//!                          ┌────────────────────┐
//!                          │  CommandResult     │
//!                          │  - response (MD)   │
//!                          │  - effect          │
//!                          └────────────────────┘
//! ```
//!
//! # Commands
//!
//! All commands follow the format: `!qazo <subcommand> [args...]`
//!
//! | Command | Arguments | Description |
//! |---------|-----------|-------------|
//! | `help` | None | Display help information |
//! | `read`, `missed`, `later` | `<prayer>` | Answer a reminder |
//! | `today` | None | Statuses of today's prayers |
//! | `times` | None | Today's prayer times |
//! | `summary` | None | Qazo per prayer |
//! | `reset` | None | Zero the qazo |
//! | `add`, `remove` | `period <2y 3m 5d>`, `counts <n n n n n>` or `range <from-to> [prayers]` | Manual qazo adjustment |
//! | `location` | `<lat> <lon>` | Set the location from coordinates |
//! | `city` | `<name>` | Set the location to a known city |
//!
//! # Error Handling
//!
//! - **Silent Errors** ([`CommandParseError::NotForBot`]): Messages that aren't commands
//!   or are for a different bot. These should not generate responses.
//!
//! - **User Errors** ([`CommandParseError::InvalidCommand`]): Invalid command syntax
//!   or arguments. These include helpful error messages for the user.

mod actions;
mod command;
mod commander;
mod markdown_response;

pub use crate::commands::{
    command::Command,
    commander::Commander,
    markdown_response::{
        format_action_outcome, format_internal_error, format_ledger, format_location_set,
        format_welcome_back,
    },
};
use crate::{
    messaging::PrayerAction,
    qazo::{Direction, LedgerDelta},
    reminders::DayView,
    store::{Location, User},
};

/// Runtime context for command execution.
///
/// # Fields
///
/// * `user` - The user who issued the command, activity already refreshed
/// * `day` - The user's current local day: statuses, times and qazo
#[derive(Debug)]
pub struct CommandContext {
    pub user: User,
    pub day: DayView,
}

/// State change requested by a command.
///
/// Command handlers don't modify state directly. The caller applies the
/// effect through the reminder engine and completes the response with the
/// result.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandEffect {
    /// Read, missed or later on a prayer of today
    Prayer(PrayerAction),
    /// Signed ledger adjustment
    Adjust(Direction, LedgerDelta),
    /// Zero the ledger
    ResetLedger,
    /// Move the user to a new location
    Relocate(Location),
}

/// Result of command execution.
///
/// # Fields
///
/// * `response` - Markdown-formatted message to send to the Matrix room
/// * `effect` - Optional state change to apply before replying
#[derive(Debug)]
pub struct CommandResult {
    /// Markdown-formatted response message
    pub response: String,
    /// Optional state change
    pub effect: Option<CommandEffect>,
}

impl CommandResult {
    /// A read-only result.
    pub fn reply(response: String) -> Self {
        CommandResult {
            response,
            effect: None,
        }
    }

    pub fn with_effect(response: String, effect: CommandEffect) -> Self {
        CommandResult {
            response,
            effect: Some(effect),
        }
    }
}

/// Errors that can occur during command parsing.
///
/// # Variants
///
/// * `NotForBot` - Message is not a command or is for a different bot.
///   Should be handled silently without responding to the user.
///
/// * `InvalidCommand` - Command syntax or arguments are invalid.
///   Contains a user-friendly error message to display.
#[derive(Debug)]
pub enum CommandParseError {
    /// Message is not for this bot (silent error)
    NotForBot,
    /// Invalid command syntax with error message
    InvalidCommand(String),
}
