// Application state and the central event loop.
//
// One loop owns the cache and processes, strictly in receipt order, events
// from the auction channel, completed snapshot fetches, and operator
// commands. Fetches run in spawned tasks and report back tagged with their
// ticket. Every state change is pushed to the console as a fresh view.

use std::future;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use gavel_core::bidding::ActionRejection;
use gavel_core::model::Snapshot;
use gavel_core::views::{self, DerivedViews, ViewCache};

use crate::actions::ActionSubmitter;
use crate::connection::ChannelEvent;
use crate::messages::{AuctionView, ConnectionStatus, SaleOutcome, UiUpdate, UserCommand};
use crate::reconciler::{AuctionCache, FetchTicket, SnapshotOutcome, StatusEdge};
use crate::snapshot::{FetchError, SnapshotSource};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A finished snapshot fetch, reported by the task that ran it.
#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub result: Result<Snapshot, FetchError>,
}

/// Picks an index below `n` for random player selection.
pub type IndexChooser = Box<dyn FnMut(usize) -> usize + Send + Sync>;

/// Index chooser backed by the thread-local RNG.
pub fn random_chooser() -> IndexChooser {
    Box::new(|n| {
        if n == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..n)
        }
    })
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub auction_id: String,
    pub cache: AuctionCache,
    pub views: ViewCache,
    pub actions: ActionSubmitter,
    pub connection_status: ConnectionStatus,
    source: Arc<dyn SnapshotSource>,
    fetch_tx: mpsc::Sender<FetchCompletion>,
    chooser: IndexChooser,
}

impl AppState {
    pub fn new(
        actions: ActionSubmitter,
        source: Arc<dyn SnapshotSource>,
        fetch_tx: mpsc::Sender<FetchCompletion>,
    ) -> Self {
        AppState {
            auction_id: actions.auction_id().to_string(),
            cache: AuctionCache::new(),
            views: ViewCache::new(),
            actions,
            connection_status: ConnectionStatus::Connecting,
            source,
            fetch_tx,
            chooser: random_chooser(),
        }
    }

    pub fn with_chooser(mut self, chooser: IndexChooser) -> Self {
        self.chooser = chooser;
        self
    }

    /// Issue a ticket and fetch the snapshot in the background.
    pub fn request_snapshot(&mut self) {
        let ticket = self.cache.begin_fetch();
        debug!("fetching snapshot generation {}", ticket.generation);
        let source = Arc::clone(&self.source);
        let tx = self.fetch_tx.clone();
        let auction_id = self.auction_id.clone();
        tokio::spawn(async move {
            let result = source.load_snapshot(&auction_id).await;
            let _ = tx.send(FetchCompletion { ticket, result }).await;
        });
    }

    /// Build the console view for the current cache.
    pub fn view(&mut self, now: Instant) -> AuctionView {
        let cache = &self.cache;
        let derived = self
            .views
            .get_or_build(cache.revision(), || {
                DerivedViews::build(cache.teams(), cache.players(), cache.config())
            })
            .clone();
        AuctionView {
            auction_id: self.auction_id.clone(),
            loaded: cache.is_loaded(),
            live: cache.live_state().clone(),
            players: cache.players().to_vec(),
            current_player: cache.current_player().cloned(),
            leading_team: views::leading_team_name(cache.live_state(), cache.teams())
                .map(str::to_string),
            derived,
            increment: self.actions.increment(),
            next_bid: self.actions.next_bid(cache),
            bid_pending: self.actions.is_bid_pending(now),
        }
    }

    fn outcome_for(&self, edge: &StatusEdge) -> SaleOutcome {
        SaleOutcome {
            status: edge.status,
            player_name: edge
                .player_id
                .as_deref()
                .and_then(|id| self.cache.player(id))
                .map(|p| p.name.clone()),
            team_name: edge
                .team_id
                .as_deref()
                .and_then(|id| self.cache.team(id))
                .map(|t| t.name.clone()),
            amount: edge.amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until the operator quits or the auction
/// channel closes.
///
/// Listens with `tokio::select!` on:
/// 1. Auction channel events
/// 2. Completed snapshot fetches
/// 3. User commands from the console
/// 4. Expiry of a pending bid lease
pub async fn run(
    mut channel_rx: mpsc::Receiver<ChannelEvent>,
    mut fetch_rx: mpsc::Receiver<FetchCompletion>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started for auction {}", state.auction_id);
    publish_view(&mut state, &ui_tx).await;

    loop {
        let lease_deadline = state.actions.lease().deadline();

        tokio::select! {
            // --- Auction channel ---
            event = channel_rx.recv() => {
                match event {
                    Some(event) => handle_channel_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("Auction channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Snapshot completions ---
            Some(done) = fetch_rx.recv() => {
                handle_fetch_completion(&mut state, done, &ui_tx).await;
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Bid lease expiry ---
            _ = async {
                match lease_deadline {
                    Some(deadline) => time::sleep_until(deadline).await,
                    None => future::pending::<()>().await,
                }
            } => {
                if state.actions.expire_lease(Instant::now()) {
                    publish_view(&mut state, &ui_tx).await;
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

async fn handle_channel_event(
    state: &mut AppState,
    event: ChannelEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match event {
        ChannelEvent::Connected => {
            info!("Joined auction {}", state.auction_id);
            state.connection_status = ConnectionStatus::Connected;
            let _ = ui_tx
                .send(UiUpdate::ConnectionStatus(ConnectionStatus::Connected))
                .await;
            state.request_snapshot();
        }
        ChannelEvent::Disconnected { reason } => {
            if state.connection_status != ConnectionStatus::Disconnected {
                warn!("Auction channel lost: {reason}");
            }
            state.connection_status = ConnectionStatus::Disconnected;
            let _ = ui_tx
                .send(UiUpdate::ConnectionStatus(ConnectionStatus::Disconnected))
                .await;
        }
        ChannelEvent::DataUpdate => {
            debug!("data_update received");
            state.request_snapshot();
        }
        ChannelEvent::AuctionState(live) => {
            let edge = state.cache.replace_live_state(live);
            state.actions.on_live_state(state.cache.live_state());
            if let Some(edge) = edge {
                let outcome = state.outcome_for(&edge);
                announce(outcome, ui_tx).await;
            }
            publish_view(state, ui_tx).await;
        }
    }
}

async fn handle_fetch_completion(
    state: &mut AppState,
    done: FetchCompletion,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let snapshot = match done.result {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("Snapshot fetch {} failed: {e}", done.ticket.generation);
            let _ = ui_tx
                .send(UiUpdate::Error(format!("Could not load auction data: {e}")))
                .await;
            return;
        }
    };

    match state.cache.apply_snapshot(done.ticket, snapshot) {
        SnapshotOutcome::Stale => {}
        SnapshotOutcome::Applied {
            live_state_applied,
            edge,
        } => {
            if live_state_applied {
                state.actions.on_live_state(state.cache.live_state());
            }
            if let Some(edge) = edge {
                let outcome = state.outcome_for(&edge);
                announce(outcome, ui_tx).await;
            }
            publish_view(state, ui_tx).await;
        }
    }
}

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let AppState {
        cache,
        actions,
        chooser,
        ..
    } = state;

    let result: Result<(), ActionRejection> = match cmd {
        UserCommand::StartPlayer(id) => actions.start_player(cache, &id),
        UserCommand::StartRandom { category } => {
            actions.start_random(cache, &category, |n| chooser(n))
        }
        UserCommand::StartRandomUnsold => actions.start_random_unsold(cache, |n| chooser(n)),
        UserCommand::PlaceBid(team_id) => actions
            .place_bid(cache, &team_id, Instant::now())
            .map(|amount| debug!("bid of {amount}L sent for {team_id}")),
        UserCommand::UndoBid => actions.undo_bid(cache),
        UserCommand::Sell => actions.sell(),
        UserCommand::Unsell => actions.unsell(),
        UserCommand::TogglePause => actions.toggle_pause(),
        UserCommand::ResetRound => actions.reset_round(),
        UserCommand::AdjustIncrement(steps) => {
            actions.adjust_increment(steps);
            Ok(())
        }
        UserCommand::Refresh => actions.request_refresh(),
        UserCommand::Reload => {
            state.request_snapshot();
            return;
        }
        UserCommand::Quit => Ok(()),
    };

    match result {
        Ok(()) => publish_view(state, ui_tx).await,
        Err(rejection) => {
            debug!("action rejected: {rejection}");
            let _ = ui_tx.send(UiUpdate::Error(rejection.to_string())).await;
        }
    }
}

async fn announce(outcome: SaleOutcome, ui_tx: &mpsc::Sender<UiUpdate>) {
    info!("{}", outcome.headline());
    let _ = ui_tx.send(UiUpdate::Outcome(outcome)).await;
}

async fn publish_view(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let view = state.view(Instant::now());
    let _ = ui_tx.send(UiUpdate::View(Box::new(view))).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
