//! Matrix client synchronization and event handling.
//!
//! The [`MatrixSync::sync`] method:
//! 1. Performs an initial sync to catch up on offline events (especially invites)
//! 2. Sets up event handlers for auto-joining rooms and message processing
//! 3. Enters a continuous sync loop with automatic token persistence
//!
//! Messages sent while the bot was offline are skipped.

use anyhow::Result;
use std::sync::Arc;

use log::{debug, error, info, warn};
use matrix_sdk::{
    Client, LoopCtrl, Room, RoomState,
    config::SyncSettings,
    ruma::{
        api::client::filter::FilterDefinition,
        events::room::{
            member::StrippedRoomMemberEvent,
            message::{MessageType, OriginalSyncRoomMessageEvent},
        },
    },
};
use tokio::time::{Duration, sleep};

use crate::matrix::session::MatrixSession;

/// Delay between two attempts of the initial sync.
const INITIAL_SYNC_RETRY: Duration = Duration::from_secs(5);

pub struct MatrixSync {
    client: Client,
    session: MatrixSession,
}

impl MatrixSync {
    pub fn new(client: &Client, session: &MatrixSession) -> Self {
        MatrixSync {
            client: client.to_owned(),
            session: session.to_owned(),
        }
    }

    pub async fn sync<F>(&self, on_message: F) -> Result<()>
    where
        F: Fn(String, String, String, String) + Send + Sync + 'static + Clone,
    {
        info!("start syncing");

        // Auto join rooms when invited
        self.client.add_event_handler(auto_join_rooms);

        // Enable room members lazy-loading
        // See <https://spec.matrix.org/v1.6/client-server-api/#lazy-loading-room-members>.
        let filter = FilterDefinition::with_lazy_loading();
        let mut sync_settings = SyncSettings::default().filter(filter.into());

        // Get the last sync token from the session if it exists
        if let Some(sync_token) = self.session.get_sync_token() {
            sync_settings = sync_settings.token(sync_token);
        }

        // First sync to only get the invitations received while offline
        loop {
            match self.client.sync_once(sync_settings.clone()).await {
                Ok(response) => {
                    sync_settings = sync_settings.token(response.next_batch.clone());
                    if let Err(err) = self.session.persist_sync_token(response.next_batch).await {
                        error!("failed to persist sync token: {:?}", err);
                    }
                    break;
                }
                Err(error) => {
                    error!("an error occurred during initial sync: {error}, trying again");
                    sleep(INITIAL_SYNC_RETRY).await;
                }
            }
        }

        let on_message_arc = Arc::new(on_message);

        // Listen to incoming room messages. Because we are listening after the sync_once, we only get new messages.
        self.client.add_event_handler({
            let on_message = Arc::clone(&on_message_arc);
            move |event: OriginalSyncRoomMessageEvent, room: Room, client: Client| async move {
                on_room_message(event, room, client, &on_message).await
            }
        });

        self.client
            .sync_with_result_callback(sync_settings, |sync_result| async move {
                let response = sync_result?;

                // We persist the token each time to be able to restore our session
                if let Err(err) = self.session.persist_sync_token(response.next_batch).await {
                    error!("failed to persist sync token: {:?}", err);
                }

                Ok(LoopCtrl::Continue)
            })
            .await?;

        Ok(())
    }
}

async fn auto_join_rooms(room_member: StrippedRoomMemberEvent, client: Client, room: Room) {
    let Some(user_id) = client.user_id() else {
        warn!("could not get user id from client");
        return;
    };

    // Ignore if the invite is not for us
    if room_member.state_key != user_id {
        return;
    }

    tokio::spawn(async move {
        info!("auto joining room {}", room.room_id());
        let mut delay = 2;

        while let Err(err) = room.join().await {
            // retry autojoin due to synapse sending invites, before the
            // invited user can join for more information see
            // https://github.com/matrix-org/synapse/issues/4345
            error!(
                "failed to join room {} ({err:?}), retrying in {delay}s",
                room.room_id()
            );

            sleep(Duration::from_secs(delay)).await;
            delay *= 2;

            if delay > 3600 {
                error!("can't join room {} ({err:?})", room.room_id());
                return;
            }
        }
        info!("successfully joined room {}", room.room_id());
    });
}

async fn on_room_message<F>(
    event: OriginalSyncRoomMessageEvent,
    room: Room,
    client: Client,
    on_message: &Arc<F>,
) where
    F: Fn(String, String, String, String) + Send + Sync + 'static,
{
    // Ignore messages from non-joined rooms
    if room.state() != RoomState::Joined {
        return;
    }

    // Ignore our own reminders and replies
    if client.user_id() == Some(&*event.sender) {
        return;
    }

    // Only handle text messages
    let MessageType::Text(text_content) = event.content.msgtype else {
        return;
    };

    debug!("message {} from {} in {}", event.event_id, event.sender, room.room_id());
    on_message(
        text_content.body,
        room.room_id().to_string(),
        event.sender.to_string(),
        event.event_id.to_string(),
    );
}
