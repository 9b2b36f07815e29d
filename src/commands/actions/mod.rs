//! Command action handlers.
//!
//! Individual handler functions for each bot command. Each handler receives a
//! [`CommandContext`](crate::commands::CommandContext), processes the command,
//! and returns a [`CommandResult`](crate::commands::CommandResult).
//!
//! # State Changes
//!
//! Handlers don't modify state directly. Instead, they return a state change
//! request via `effect` in the [`CommandResult`](crate::commands::CommandResult).

mod help;
mod ledger;
mod location;
mod prayer;
mod today;

pub use crate::commands::actions::{
    help::handle_help,
    ledger::{handle_adjust, handle_reset, handle_summary},
    location::{handle_city, handle_location},
    prayer::handle_prayer,
    today::{handle_times, handle_today},
};
