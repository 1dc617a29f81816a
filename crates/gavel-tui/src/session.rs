// Live session wiring: event channel, app loop, and console.
//
// Startup sequence:
// 1. Open the event channel connection for the auction
// 2. Build the action submitter and app state
// 3. Create mpsc channels
// 4. Spawn the app loop
// 5. Run the console until the operator quits
// 6. Shut down the connection and wait for the app loop

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use gavel_app::actions::ActionSubmitter;
use gavel_app::api::AuctionApi;
use gavel_app::app::{self, AppState};
use gavel_app::connection::{AuctionConnection, ChannelEvent, ConnectionOptions, WsConnector};
use gavel_core::config::Config;
use gavel_core::protocol::ClientIntent;

use crate::tui::{self, Mode};

/// How long the app loop gets to wind down after the console exits.
const APP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a one-shot refresh nudge may take to connect and send.
const NUDGE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run_session(
    config: &Config,
    api: AuctionApi,
    auction_id: &str,
    mode: Mode,
) -> anyhow::Result<()> {
    // 1. Open the event channel connection
    let connector = WsConnector::from_config(config).context("invalid server URL")?;
    let (mut connection, channel_rx) =
        AuctionConnection::open(connector, auction_id, ConnectionOptions::from_config(config));
    info!("Opening {mode:?} session for auction {auction_id}");

    // 2. Action submitter and app state
    let actions = ActionSubmitter::new(auction_id, Box::new(connection.intents()));
    let (fetch_tx, fetch_rx) = mpsc::channel(16);
    let state = AppState::new(actions, Arc::new(api), fetch_tx);

    // 3. Channels between the app loop and the console
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 4. Spawn the app loop
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(channel_rx, fetch_rx, cmd_rx, ui_tx, state).await {
            error!("Application loop error: {e}");
        }
    });

    // 5. Run the console (blocks until the operator quits)
    let console_result = tui::run(ui_rx, cmd_tx, mode).await;
    if let Err(e) = &console_result {
        error!("Console error: {e}");
    }

    // 6. Cleanup
    connection.shutdown().await;
    if tokio::time::timeout(APP_SHUTDOWN_TIMEOUT, app_handle)
        .await
        .is_err()
    {
        warn!("app loop did not exit within {APP_SHUTDOWN_TIMEOUT:?}");
    }
    info!("Session for auction {auction_id} closed");
    console_result
}

/// Tell every subscriber of `auction_id` to re-fetch its snapshot.
///
/// Opens a short-lived connection, waits for it to join the room, sends
/// `data_update` and closes. Returns false if the nudge could not be sent.
pub async fn nudge_subscribers(config: &Config, auction_id: &str) -> bool {
    let connector = match WsConnector::from_config(config) {
        Ok(c) => c,
        Err(e) => {
            warn!("cannot nudge subscribers: {e}");
            return false;
        }
    };
    let (mut connection, mut events) =
        AuctionConnection::open(connector, auction_id, ConnectionOptions::from_config(config));

    let joined = tokio::time::timeout(NUDGE_TIMEOUT, async {
        while let Some(event) = events.recv().await {
            if event == ChannelEvent::Connected {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false);

    let sent = joined && connection.submit(ClientIntent::RequestRefresh).is_ok();
    connection.shutdown().await;
    if sent {
        info!("data_update sent for auction {auction_id}");
    } else {
        warn!("could not reach the event channel to announce changes to {auction_id}");
    }
    sent
}
