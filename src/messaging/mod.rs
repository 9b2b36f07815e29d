//! Outbound messaging seam between the reminder engine and the chat network.
//!
//! The engine only knows recipients, texts and the actions attached to a
//! reminder. The concrete transport (Matrix, see [`crate::matrix`]) decides
//! how actions are rendered and what a [`MessageHandle`] contains.

use std::fmt;

use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::prayers::Prayer;

/// Opaque identifier of a sent message, used to delete it later.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(pub String);

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The message was already deleted, which satisfies the request.
    AlreadyGone,
}

/// What a user can answer to a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Read,
    Missed,
    /// Defer: nothing changes until the next coarse tick.
    Later,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Read => "read",
            ActionKind::Missed => "missed",
            ActionKind::Later => "later",
        }
    }
}

/// An action attached to a reminder, e.g. "read fajr".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrayerAction {
    pub prayer: Prayer,
    pub kind: ActionKind,
}

impl PrayerAction {
    pub fn new(prayer: Prayer, kind: ActionKind) -> Self {
        PrayerAction { prayer, kind }
    }
}

impl fmt::Display for PrayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.prayer)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("unknown recipient {0}")]
    UnknownRecipient(String),
    #[error("failed to send message to {recipient}: {reason}")]
    Send { recipient: String, reason: String },
    #[error("failed to delete message {handle} in {recipient}: {reason}")]
    Delete {
        recipient: String,
        handle: MessageHandle,
        reason: String,
    },
}

/// Sends and deletes messages on behalf of the reminder engine.
#[automock]
pub trait Messenger: Send + Sync {
    /// Sends `text` with its `actions` to `recipient` and returns the handle
    /// of the new message.
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        actions: &[PrayerAction],
    ) -> Result<MessageHandle, MessagingError>;

    /// Deletes a previously sent message. Deleting a message twice is not an
    /// error and yields [`DeleteOutcome::AlreadyGone`].
    async fn delete(
        &self,
        recipient: &str,
        handle: &MessageHandle,
    ) -> Result<DeleteOutcome, MessagingError>;
}

#[cfg(test)]
pub use tests::RecordingMessenger;
