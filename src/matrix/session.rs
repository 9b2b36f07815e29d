//! Persistence of the Matrix login between restarts.
//!
//! The session directory holds two entries:
//!
//! - `session`: JSON with the user session and the last sync token
//! - `crypto`: the SQLite state and crypto store of the SDK

use std::path::Path;

use tokio::fs;

use log::{debug, trace};
use matrix_sdk::authentication::matrix;
use serde::{Deserialize, Serialize};

use crate::utils::get_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    user_session: matrix::MatrixSession,

    #[serde(skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

#[derive(Clone)]
pub struct MatrixSession {
    session: Option<Session>,
    store_path: String,
    session_path: String,
}

impl MatrixSession {
    /// Reads the session stored in `dir_path`, if any.
    pub async fn new(dir_path: &str) -> Result<MatrixSession, anyhow::Error> {
        debug!("read session at {}", dir_path);

        let store_path = get_path(dir_path, "crypto")?;
        let session_path = get_path(dir_path, "session")?;
        debug!("store path {}, session path {}", store_path, session_path);

        let session = MatrixSession::get_session(&session_path).await.ok();
        debug!("found user session: {}", session.is_some());

        Ok(MatrixSession {
            session,
            store_path,
            session_path,
        })
    }

    async fn get_session(session_path: &str) -> Result<Session, anyhow::Error> {
        if !Path::new(session_path).exists() {
            return Err(anyhow::anyhow!("session file does not exist"));
        }

        let session_data = fs::read_to_string(session_path).await?;
        let session: Session = serde_json::from_str(&session_data)?;
        Ok(session)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn get_store_path(&self) -> &str {
        &self.store_path
    }

    pub fn get_user_session(&self) -> Option<&matrix::MatrixSession> {
        self.session.as_ref().map(|s| &s.user_session)
    }

    pub fn get_sync_token(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.sync_token.clone())
    }

    pub async fn persist_sync_token(&self, sync_token: String) -> anyhow::Result<()> {
        trace!("persist sync token {}", sync_token);

        let mut full_session = MatrixSession::get_session(&self.session_path).await?;
        full_session.sync_token = Some(sync_token);

        let serialized_session = serde_json::to_string(&full_session)?;
        fs::write(&self.session_path, serialized_session).await?;
        Ok(())
    }

    pub async fn persist_user_session(
        &self,
        user_session: &matrix::MatrixSession,
    ) -> anyhow::Result<()> {
        trace!("persist user session");

        let session = Session {
            user_session: user_session.clone(),
            sync_token: None,
        };

        let serialized_session = serde_json::to_string(&session)?;
        fs::write(&self.session_path, serialized_session).await?;
        Ok(())
    }
}
