//! Matrix client wrapper for bot messaging and synchronization.
//!
//! This module provides a high-level [`MatrixClient`] interface that wraps the
//! Matrix SDK client. It is the [`Messenger`] of the reminder engine: a
//! reminder is a Markdown message in the user's room, and deleting a reminder
//! redacts it.

use log::{debug, error, info, warn};
use matrix_sdk::{
    Client, Room,
    ruma::{
        EventId, RoomId, UserId,
        api::client::error::ErrorKind,
        events::room::message::{
            AddMentions, ForwardThread, ReplyMetadata, RoomMessageEventContent,
        },
    },
};

use crate::{
    matrix::{
        UserCredentials, encryption::setup_client, session::MatrixSession, sync::MatrixSync,
    },
    messaging::{DeleteOutcome, MessageHandle, Messenger, MessagingError, PrayerAction},
};

const DISPLAY_NAME: &str = "Qazo";

pub struct MatrixClient {
    matrix_sync: MatrixSync,
    client: Client,
}

impl MatrixClient {
    /// Logs in, or restores the session stored in `session_path`, and sets up
    /// end-to-end encryption.
    pub async fn new(
        user_credentials: &UserCredentials,
        session_path: &str,
    ) -> Result<Self, anyhow::Error> {
        let matrix_session = MatrixSession::new(session_path).await.map_err(|e| {
            error!("failed to create matrix session: {:?}", e);
            anyhow::anyhow!("failed to create matrix session")
        })?;

        let client = setup_client(user_credentials, &matrix_session)
            .await
            .map_err(|e| {
                error!("failed to setup matrix client: {:?}", e);
                anyhow::anyhow!("failed to setup matrix client")
            })?;

        // Set display name
        if let Err(e) = client.account().set_display_name(Some(DISPLAY_NAME)).await {
            warn!("failed to set display name: {:?}", e);
        }

        let matrix_sync = MatrixSync::new(&client, &matrix_session);

        Ok(MatrixClient {
            matrix_sync,
            client,
        })
    }

    /// Runs the sync loop until it fails. `on_message` receives the body,
    /// room id, sender id and event id of every new text message.
    pub async fn sync<F>(&self, on_message: F) -> Result<(), anyhow::Error>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
    {
        match self.matrix_sync.sync(on_message).await {
            Ok(_) => info!("matrix sync ended successfully"),
            Err(e) => error!("matrix sync ended with error: {:?}", e),
        }

        Ok(())
    }

    /// Replies to a command message. Failures are logged.
    pub async fn send_reply(&self, room_id: &str, sender_id: &str, event_id: &str, body: &str) {
        let (Ok(sender), Ok(event)) = (UserId::parse(sender_id), EventId::parse(event_id)) else {
            error!("invalid reply target {} / {}", sender_id, event_id);
            return;
        };

        let content = RoomMessageEventContent::text_markdown(body).make_reply_to(
            ReplyMetadata::new(&event, &sender, None),
            ForwardThread::No,
            AddMentions::No,
        );

        if let Err(e) = self.send_content(room_id, content).await {
            error!("failed to send reply: {}", e);
        }
    }

    fn room(&self, room_id: &str) -> Result<Room, MessagingError> {
        let room_id_obj = RoomId::parse(room_id)
            .map_err(|_| MessagingError::UnknownRecipient(room_id.to_string()))?;

        self.client
            .get_room(&room_id_obj)
            .ok_or_else(|| MessagingError::UnknownRecipient(room_id.to_string()))
    }

    async fn send_content(
        &self,
        room_id: &str,
        content: RoomMessageEventContent,
    ) -> Result<MessageHandle, MessagingError> {
        let room = self.room(room_id)?;

        let result = room.send(content).await.map_err(|e| MessagingError::Send {
            recipient: room_id.to_string(),
            reason: e.to_string(),
        })?;

        Ok(MessageHandle(result.event_id.to_string()))
    }
}

/// Renders the actions of a reminder as commands the user can copy.
fn format_actions(actions: &[PrayerAction]) -> String {
    actions
        .iter()
        .map(|a| format!("`!qazo {}`", a))
        .collect::<Vec<String>>()
        .join(" · ")
}

/// Appends the action hints to a reminder text.
fn with_actions(text: &str, actions: &[PrayerAction]) -> String {
    if actions.is_empty() {
        return text.to_owned();
    }
    format!("{}\n\n{}", text, format_actions(actions))
}

impl Messenger for MatrixClient {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        actions: &[PrayerAction],
    ) -> Result<MessageHandle, MessagingError> {
        let content = RoomMessageEventContent::text_markdown(with_actions(text, actions));
        let handle = self.send_content(recipient, content).await?;

        debug!("sent message {} to {}", handle, recipient);
        Ok(handle)
    }

    async fn delete(
        &self,
        recipient: &str,
        handle: &MessageHandle,
    ) -> Result<DeleteOutcome, MessagingError> {
        let room = self.room(recipient)?;
        let event_id = EventId::parse(&handle.0).map_err(|e| MessagingError::Delete {
            recipient: recipient.to_string(),
            handle: handle.clone(),
            reason: e.to_string(),
        })?;

        match room.redact(&event_id, None, None).await {
            Ok(_) => {
                debug!("redacted message {} in {}", handle, recipient);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if matches!(e.client_api_error_kind(), Some(ErrorKind::NotFound)) => {
                Ok(DeleteOutcome::AlreadyGone)
            }
            Err(e) => Err(MessagingError::Delete {
                recipient: recipient.to_string(),
                handle: handle.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
