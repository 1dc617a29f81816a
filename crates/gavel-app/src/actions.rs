// Action submitter: local precondition checks in front of every auctioneer
// intent, plus the single-bid lease.
//
// Emits are fire-and-forget. Nothing here assumes an intent succeeded; the
// effect only shows up when the server pushes new state.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use gavel_core::bidding::{validate_bid, ActionRejection, Increment};
use gavel_core::model::{Amount, Disposition, LiveAuctionState};
use gavel_core::protocol::ClientIntent;
use gavel_core::views;

use crate::connection::{ChannelError, IntentSender};
use crate::reconciler::AuctionCache;

/// How long a placed bid blocks further bids without an acknowledging push.
pub const BID_LEASE: Duration = Duration::from_millis(1000);

/// Destination for submitted intents.
pub trait IntentSink: Send + Sync {
    fn submit(&self, intent: ClientIntent) -> Result<(), ChannelError>;
}

impl IntentSink for IntentSender {
    fn submit(&self, intent: ClientIntent) -> Result<(), ChannelError> {
        IntentSender::submit(self, intent)
    }
}

/// At most one bid in flight. Released on expiry or when a push shows the
/// bid or leader moved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BidLease {
    held_until: Option<Instant>,
}

impl BidLease {
    pub fn is_held(&self, now: Instant) -> bool {
        matches!(self.held_until, Some(deadline) if now < deadline)
    }

    pub fn acquire(&mut self, now: Instant) {
        self.held_until = Some(now + BID_LEASE);
    }

    pub fn release(&mut self) {
        self.held_until = None;
    }

    /// Deadline of a currently held lease.
    pub fn deadline(&self) -> Option<Instant> {
        self.held_until
    }
}

pub struct ActionSubmitter {
    auction_id: String,
    sink: Box<dyn IntentSink>,
    lease: BidLease,
    increment: Increment,
    last_seen: Option<(Amount, Option<String>)>,
}

impl ActionSubmitter {
    pub fn new(auction_id: impl Into<String>, sink: Box<dyn IntentSink>) -> Self {
        Self {
            auction_id: auction_id.into(),
            sink,
            lease: BidLease::default(),
            increment: Increment::new(),
            last_seen: None,
        }
    }

    pub fn auction_id(&self) -> &str {
        &self.auction_id
    }

    pub fn increment(&self) -> Amount {
        self.increment.value()
    }

    pub fn lease(&self) -> &BidLease {
        &self.lease
    }

    pub fn is_bid_pending(&self, now: Instant) -> bool {
        self.lease.is_held(now)
    }

    /// Drop a lapsed lease. Returns true when one was dropped.
    pub fn expire_lease(&mut self, now: Instant) -> bool {
        match self.lease.deadline() {
            Some(deadline) if now >= deadline => {
                debug!("bid lease lapsed without acknowledgement");
                self.lease.release();
                true
            }
            _ => false,
        }
    }

    /// Amount the next bid would be, for display.
    pub fn next_bid(&self, cache: &AuctionCache) -> Amount {
        gavel_core::bidding::next_bid_amount(
            cache.live_state(),
            cache.current_player(),
            self.increment.value(),
        )
    }

    /// Track a new live state: re-suggest the increment when the bid moves
    /// and release the bid lease when the bid or leader moved.
    pub fn on_live_state(&mut self, state: &LiveAuctionState) {
        self.increment.observe_bid(state.current_bid);
        let seen = (state.current_bid, state.leading_team_id.clone());
        if self.last_seen.as_ref() != Some(&seen) {
            if self.lease.deadline().is_some() {
                debug!("bid acknowledged, releasing lease");
            }
            self.lease.release();
            self.last_seen = Some(seen);
        }
    }

    pub fn adjust_increment(&mut self, steps: i64) -> Amount {
        self.increment.adjust(steps);
        self.increment.value()
    }

    // ------------------------------------------------------------------
    // Player selection
    // ------------------------------------------------------------------

    /// Put a queued (or previously unsold) player on the block.
    pub fn start_player(&mut self, cache: &AuctionCache, player_id: &str) -> Result<(), ActionRejection> {
        let player = cache
            .player(player_id)
            .ok_or_else(|| ActionRejection::UnknownPlayer(player_id.to_string()))?;
        if player.disposition() == Disposition::Sold {
            return Err(ActionRejection::PlayerAlreadySold(player.name.clone()));
        }
        info!("starting {} at base price {}", player.name, player.base_price);
        self.emit(ClientIntent::StartPlayer {
            auction_id: self.auction_id.clone(),
            player_id: player.id.clone(),
            base_price: player.base_price,
        })
    }

    /// Start a random queued player from `category`. `choose(n)` returns an
    /// index below `n`.
    pub fn start_random<F>(
        &mut self,
        cache: &AuctionCache,
        category: &str,
        choose: F,
    ) -> Result<(), ActionRejection>
    where
        F: FnOnce(usize) -> usize,
    {
        let groups = views::group_queue_by_category(cache.players(), cache.config());
        let group = groups
            .iter()
            .find(|g| g.category == category)
            .filter(|g| !g.players.is_empty())
            .ok_or_else(|| ActionRejection::EmptyCategory(category.to_string()))?;
        let idx = choose(group.players.len()) % group.players.len();
        let player_id = group.players[idx].id.clone();
        self.start_player(cache, &player_id)
    }

    /// Start a random unsold player for re-auction.
    pub fn start_random_unsold<F>(&mut self, cache: &AuctionCache, choose: F) -> Result<(), ActionRejection>
    where
        F: FnOnce(usize) -> usize,
    {
        let unsold: Vec<&str> = cache
            .players()
            .iter()
            .filter(|p| p.disposition() == Disposition::Unsold)
            .map(|p| p.id.as_str())
            .collect();
        if unsold.is_empty() {
            return Err(ActionRejection::NoUnsoldPlayers);
        }
        let player_id = unsold[choose(unsold.len()) % unsold.len()].to_string();
        self.start_player(cache, &player_id)
    }

    // ------------------------------------------------------------------
    // Bidding
    // ------------------------------------------------------------------

    /// Validate and send a bid for `team_id`. Returns the amount sent.
    pub fn place_bid(
        &mut self,
        cache: &AuctionCache,
        team_id: &str,
        now: Instant,
    ) -> Result<Amount, ActionRejection> {
        if self.lease.is_held(now) {
            return Err(ActionRejection::BidPending);
        }
        let standing = cache
            .team(team_id)
            .map(|t| views::team_purse(t, cache.players()));
        let amount = validate_bid(
            cache.live_state(),
            cache.current_player(),
            standing.as_ref(),
            team_id,
            self.increment.value(),
        )?;

        self.emit(ClientIntent::PlaceBid {
            auction_id: self.auction_id.clone(),
            team_id: team_id.to_string(),
            amount,
        })?;
        self.lease.acquire(now);
        Ok(amount)
    }

    pub fn undo_bid(&mut self, cache: &AuctionCache) -> Result<(), ActionRejection> {
        if cache.live_state().leading_team_id.is_none() {
            return Err(ActionRejection::NoLeadingTeam);
        }
        self.emit(ClientIntent::UndoBid {
            auction_id: self.auction_id.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Round control
    // ------------------------------------------------------------------

    pub fn sell(&mut self) -> Result<(), ActionRejection> {
        self.emit(ClientIntent::SellPlayer {
            auction_id: self.auction_id.clone(),
        })
    }

    pub fn unsell(&mut self) -> Result<(), ActionRejection> {
        self.emit(ClientIntent::UnsellPlayer {
            auction_id: self.auction_id.clone(),
        })
    }

    pub fn toggle_pause(&mut self) -> Result<(), ActionRejection> {
        self.emit(ClientIntent::TogglePause {
            auction_id: self.auction_id.clone(),
        })
    }

    pub fn reset_round(&mut self) -> Result<(), ActionRejection> {
        self.emit(ClientIntent::ResetRound {
            auction_id: self.auction_id.clone(),
        })
    }

    /// Ask all subscribers to re-fetch (after setup edits).
    pub fn request_refresh(&mut self) -> Result<(), ActionRejection> {
        self.emit(ClientIntent::RequestRefresh)
    }

    fn emit(&self, intent: ClientIntent) -> Result<(), ActionRejection> {
        self.sink.submit(intent).map_err(|e| {
            debug!("intent not sent: {e}");
            ActionRejection::NotConnected
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
