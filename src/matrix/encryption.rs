//! Matrix client encryption setup and recovery.
//!
//! Reminders land in encrypted direct rooms, so the bot needs a verified
//! device. [`setup_client`] either creates a new session (login, cross-signing,
//! key backup and secret storage) or restores the persisted one and imports
//! its secrets with the recovery passphrase.

use anyhow::{anyhow, bail};
use log::{debug, error, info};
use matrix_sdk::{
    Client,
    encryption::{
        BackupDownloadStrategy, EncryptionSettings,
        recovery::{RecoveryError, RecoveryState},
    },
    ruma::{OwnedUserId, api::client::uiaa},
};

use crate::matrix::{UserCredentials, session::MatrixSession};

const DEVICE_DISPLAY_NAME: &str = "qazo bot";

/// Bootstraps cross-signing, answering the interactive authentication with
/// the account password when the server asks for it.
async fn bootstrap_cross_signing(
    client: &Client,
    UserCredentials {
        user_id,
        password,
        passphrase: _,
    }: &UserCredentials,
) -> Result<(), anyhow::Error> {
    debug!("setting up cross signing");

    let Err(e) = client
        .encryption()
        .bootstrap_cross_signing_if_needed(None)
        .await
    else {
        debug!("cross signing already set up");
        return Ok(());
    };

    let Some(response) = e.as_uiaa_response() else {
        bail!("error bootstrapping cross signing: {:?}", e);
    };
    let mut password = uiaa::Password::new(
        uiaa::UserIdentifier::UserIdOrLocalpart(user_id.to_owned()),
        password.to_owned(),
    );
    password.session = response.session.clone();

    // On the failed attempt we can use `bootstrap_cross_signing` immediately
    client
        .encryption()
        .bootstrap_cross_signing(Some(uiaa::AuthData::Password(password)))
        .await?;

    debug!("cross signing set up");
    Ok(())
}

/// Enables key backup and secret storage protected by the passphrase.
async fn enable_recovery(
    client: &Client,
    user_credentials: &UserCredentials,
) -> Result<(), anyhow::Error> {
    debug!("enabling recovery");

    let recovery = client.encryption().recovery();

    match recovery
        .enable()
        .with_passphrase(&user_credentials.passphrase)
        .await
    {
        Ok(_) => debug!("recovery enabled"),
        Err(RecoveryError::BackupExistsOnServer) => debug!("recovery already enabled"),
        Err(e) => bail!("error enabling recovery: {:?}", e),
    }

    Ok(())
}

async fn encryption_check(client: &Client) -> Result<(), anyhow::Error> {
    let recovery = client.encryption().recovery();
    if recovery.state() != RecoveryState::Enabled {
        error!("recovery is not enabled after enabling it");
        bail!("recovery is disabled after enabling it");
    }

    let Some(device) = client.encryption().get_own_device().await? else {
        bail!("own device not found after login");
    };
    if !device.is_verified() {
        error!("device is not verified after setting up encryption");
        bail!("device is not verified after setting up encryption");
    }

    Ok(())
}

async fn create_session(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    // Enable key backup and cross signing by default
    let encryption_settings = EncryptionSettings {
        auto_enable_cross_signing: true,
        backup_download_strategy: BackupDownloadStrategy::default(),
        auto_enable_backups: true,
    };

    let bot_id: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let client = Client::builder()
        .sqlite_store(
            matrix_session.get_store_path(),
            Some(&user_credentials.passphrase),
        )
        .with_encryption_settings(encryption_settings)
        .server_name(bot_id.server_name())
        .build()
        .await?;

    debug!("matrix client created");

    client
        .matrix_auth()
        .login_username(bot_id, &user_credentials.password)
        .initial_device_display_name(DEVICE_DISPLAY_NAME)
        .send()
        .await?;

    bootstrap_cross_signing(&client, user_credentials).await?;
    enable_recovery(&client, user_credentials).await?;

    debug!("trying to recover secrets");
    client
        .encryption()
        .recovery()
        .recover(&user_credentials.passphrase)
        .await?;
    debug!("secrets recovered");

    encryption_check(&client).await?;

    let user_session = client
        .matrix_auth()
        .session()
        .ok_or_else(|| anyhow!("no user session after login"))?;
    if let Err(err) = matrix_session.persist_user_session(&user_session).await {
        error!("error persisting user session: {:?}", err);
        bail!("error persisting user session: {:?}", err);
    }

    info!("matrix client setup complete");
    Ok(client)
}

async fn restore_session(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    info!("restoring matrix session from disk");

    let user_session = matrix_session
        .get_user_session()
        .ok_or_else(|| anyhow!("no user session to restore"))?
        .clone();

    let bot_id: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let client: Client = Client::builder()
        .server_name(bot_id.server_name())
        .sqlite_store(
            matrix_session.get_store_path(),
            Some(&user_credentials.passphrase),
        )
        .build()
        .await?;

    client.restore_session(user_session).await?;

    // Import secrets from secret storage
    let secret_store = client
        .encryption()
        .secret_storage()
        .open_secret_store(&user_credentials.passphrase)
        .await?;
    secret_store.import_secrets().await?;

    encryption_check(&client).await?;

    info!("matrix session restored successfully");
    Ok(client)
}

/// Returns a logged in client with end-to-end encryption ready.
pub async fn setup_client(
    user_credentials: &UserCredentials,
    matrix_session: &MatrixSession,
) -> Result<Client, anyhow::Error> {
    info!(
        "setting up matrix client for user {}",
        user_credentials.user_id
    );

    if matrix_session.has_session() {
        restore_session(user_credentials, matrix_session).await
    } else {
        create_session(user_credentials, matrix_session).await
    }
}
