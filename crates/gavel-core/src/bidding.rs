// Bid arithmetic and local bid validation.
//
// The server is the authority on every bid. These checks only exist to
// reject obviously doomed bids before they leave the client.

use crate::model::{Amount, AuctionStatus, LiveAuctionState, Player};
use crate::views::TeamStanding;

/// Manual increment adjustments move in steps of this size.
pub const INCREMENT_STEP: Amount = 5;

/// The increment never drops below this.
pub const MIN_INCREMENT: Amount = 1;

/// Suggested increment for a given current bid. Thresholds are inclusive.
pub fn suggested_increment(current_bid: Amount) -> Amount {
    if current_bid >= 1000 {
        100
    } else if current_bid >= 500 {
        50
    } else if current_bid >= 300 {
        20
    } else {
        // >= 100 and below 100 both step by 10.
        10
    }
}

/// Operator-facing increment: auto-suggested from the current bid and
/// manually adjustable until the bid moves again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Increment {
    value: Amount,
    observed_bid: Option<Amount>,
}

impl Default for Increment {
    fn default() -> Self {
        Increment {
            value: suggested_increment(0),
            observed_bid: None,
        }
    }
}

impl Increment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Amount {
        self.value
    }

    /// Record the latest current bid. When it differs from the last one
    /// seen, any manual adjustment is discarded and the suggestion applies.
    /// Returns true when the bid changed.
    pub fn observe_bid(&mut self, current_bid: Amount) -> bool {
        if self.observed_bid == Some(current_bid) {
            return false;
        }
        self.observed_bid = Some(current_bid);
        self.value = suggested_increment(current_bid);
        true
    }

    pub fn raise(&mut self) {
        self.value += INCREMENT_STEP;
    }

    pub fn lower(&mut self) {
        self.value = (self.value - INCREMENT_STEP).max(MIN_INCREMENT);
    }

    /// Apply `steps` manual steps (negative lowers).
    pub fn adjust(&mut self, steps: i64) {
        if steps >= 0 {
            for _ in 0..steps {
                self.raise();
            }
        } else {
            for _ in 0..steps.unsigned_abs() {
                self.lower();
            }
        }
    }
}

/// Amount the next bid must be: the base price when nobody leads, else
/// the current bid plus the increment.
pub fn next_bid_amount(
    live: &LiveAuctionState,
    current_player: Option<&Player>,
    increment: Amount,
) -> Amount {
    match live.leading_team_id {
        None => current_player.map(|p| p.base_price).unwrap_or(0),
        Some(_) => live.current_bid + increment,
    }
}

/// Why an action was refused locally. Nothing is sent when one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionRejection {
    #[error("a bid is already pending")]
    BidPending,

    #[error("unknown team {0}")]
    UnknownTeam(String),

    #[error("unknown player {0}")]
    UnknownPlayer(String),

    #[error("{0} has already been sold")]
    PlayerAlreadySold(String),

    #[error("no player is on the block")]
    NoActivePlayer,

    #[error("the auction is paused")]
    AuctionPaused,

    #[error("{0} is already the highest bidder")]
    SelfBid(String),

    #[error("insufficient funds: {team} has {remaining}L left, needs {required}L")]
    InsufficientFunds {
        team: String,
        remaining: Amount,
        required: Amount,
    },

    #[error("no team is leading")]
    NoLeadingTeam,

    #[error("no queued players in {0}")]
    EmptyCategory(String),

    #[error("no unsold players to re-auction")]
    NoUnsoldPlayers,

    #[error("not connected to the auction server")]
    NotConnected,
}

/// Validate a bid for `team_id` and return the amount to send.
///
/// Checks run in order: team exists, a player is on the block and the
/// auction is not paused, the team is not already leading, and the team's
/// remaining purse covers the next bid. The pending-bid lease is checked by
/// the caller.
pub fn validate_bid(
    live: &LiveAuctionState,
    current_player: Option<&Player>,
    bidder: Option<&TeamStanding>,
    team_id: &str,
    increment: Amount,
) -> Result<Amount, ActionRejection> {
    let bidder = bidder.ok_or_else(|| ActionRejection::UnknownTeam(team_id.to_string()))?;

    if current_player.is_none() {
        return Err(ActionRejection::NoActivePlayer);
    }
    if live.status == AuctionStatus::Paused {
        return Err(ActionRejection::AuctionPaused);
    }
    if live.leading_team_id.as_deref() == Some(team_id) {
        return Err(ActionRejection::SelfBid(bidder.name.clone()));
    }

    let amount = next_bid_amount(live, current_player, increment);
    if bidder.remaining < amount {
        return Err(ActionRejection::InsufficientFunds {
            team: bidder.name.clone(),
            remaining: bidder.remaining,
            required: amount,
        });
    }
    Ok(amount)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
