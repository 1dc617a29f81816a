// State reconciler: the client's single cached replica of the auction.
//
// Two kinds of input mutate the cache: REST snapshots (teams, players,
// optional live state and config) and pushed live-state replacements.
// Snapshots are fetched concurrently with pushes, so every fetch carries a
// `FetchTicket` recording when it was issued. A completed fetch is dropped
// if a newer one was already applied, and its live state is ignored if a
// push arrived after it was issued.

use tracing::{debug, warn};

use gavel_core::model::{
    Amount, AuctionConfig, AuctionStatus, LiveAuctionState, Player, Snapshot, Team,
};
use gavel_core::views;

/// Issued by [`AuctionCache::begin_fetch`]; hand it back with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    live_epoch: u64,
}

/// A transition into SOLD or UNSOLD, reported once per transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEdge {
    pub status: AuctionStatus,
    pub player_id: Option<String>,
    pub team_id: Option<String>,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// A newer snapshot was already applied; nothing changed.
    Stale,
    Applied {
        /// False when a later push kept the snapshot's live state out.
        live_state_applied: bool,
        edge: Option<StatusEdge>,
    },
}

#[derive(Debug, Default)]
pub struct AuctionCache {
    teams: Vec<Team>,
    players: Vec<Player>,
    live_state: LiveAuctionState,
    config: Option<AuctionConfig>,
    /// Bumps whenever teams, players or config change.
    revision: u64,
    /// Bumps on every pushed live state.
    live_epoch: u64,
    issued_generation: u64,
    applied_generation: u64,
    loaded: bool,
}

impl AuctionCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn live_state(&self) -> &LiveAuctionState {
        &self.live_state
    }

    pub fn config(&self) -> Option<&AuctionConfig> {
        self.config.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True once at least one snapshot has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        views::current_player(&self.live_state, &self.players)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Record that a snapshot fetch is starting.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued_generation += 1;
        FetchTicket {
            generation: self.issued_generation,
            live_epoch: self.live_epoch,
        }
    }

    /// Apply a completed snapshot fetch.
    pub fn apply_snapshot(&mut self, ticket: FetchTicket, snapshot: Snapshot) -> SnapshotOutcome {
        if ticket.generation <= self.applied_generation {
            debug!(
                "discarding stale snapshot generation {} (applied {})",
                ticket.generation, self.applied_generation
            );
            return SnapshotOutcome::Stale;
        }
        self.applied_generation = ticket.generation;
        let first_load = !self.loaded;
        self.loaded = true;

        for p in snapshot.players.iter().filter(|p| !p.is_consistent()) {
            warn!(
                "player {} has inconsistent sale flags (sold={}, unsold={}, soldTo={:?}, soldPrice={:?})",
                p.id, p.is_sold, p.is_unsold, p.sold_to, p.sold_price
            );
        }

        let mut data_changed = false;
        if self.teams != snapshot.teams {
            self.teams = snapshot.teams;
            data_changed = true;
        }
        if self.players != snapshot.players {
            self.players = snapshot.players;
            data_changed = true;
        }
        if let Some(config) = snapshot.config {
            if self.config.as_ref() != Some(&config) {
                self.config = Some(config);
                data_changed = true;
            }
        }
        if data_changed {
            self.revision += 1;
        }

        let (live_state_applied, edge) = match snapshot.live_state {
            Some(state) if ticket.live_epoch == self.live_epoch => {
                let edge = self.set_live_state(state);
                if first_load && edge.is_some() {
                    debug!("sale already settled before the first snapshot, not announcing");
                }
                (true, edge.filter(|_| !first_load))
            }
            Some(_) => {
                debug!("snapshot live state superseded by a later push");
                (false, None)
            }
            None => (false, None),
        };

        SnapshotOutcome::Applied {
            live_state_applied,
            edge,
        }
    }

    /// Apply a pushed live state. Never waits on in-flight fetches.
    pub fn replace_live_state(&mut self, state: LiveAuctionState) -> Option<StatusEdge> {
        self.live_epoch += 1;
        self.set_live_state(state)
    }

    fn set_live_state(&mut self, state: LiveAuctionState) -> Option<StatusEdge> {
        let entered_terminal = matches!(state.status, AuctionStatus::Sold | AuctionStatus::Unsold)
            && (state.status != self.live_state.status
                || state.current_player_id != self.live_state.current_player_id);
        let edge = entered_terminal.then(|| StatusEdge {
            status: state.status,
            player_id: state.current_player_id.clone(),
            team_id: state.leading_team_id.clone(),
            amount: state.current_bid,
        });
        self.live_state = state;
        edge
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
