//! Matrix protocol integration for the bot.
//!
//! This module provides the Matrix side of the bot:
//! - End-to-end encryption
//! - Session management and persistence
//! - Real-time event synchronization
//! - Reminder delivery and deletion through the [`Messenger`](crate::messaging::Messenger) trait
//!
//! # Architecture
//!
//! The module is structured around the [`MatrixClient`] which coordinates:
//! - **Encryption**: Cross-signing and key management via the encryption submodule
//! - **Session**: Login and session restoration via the session submodule
//! - **Sync**: Real-time event handling and room synchronization via the sync submodule

mod client;
mod encryption;
mod session;
mod sync;

pub use crate::matrix::client::MatrixClient;

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: String,
    pub password: String,
    pub passphrase: String,
}
