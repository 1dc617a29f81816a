// Messages between the app event loop and the console.

use gavel_core::model::{Amount, AuctionStatus, LiveAuctionState, Player};
use gavel_core::views::DerivedViews;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "CONNECTING",
            ConnectionStatus::Connected => "LIVE",
            ConnectionStatus::Disconnected => "OFFLINE",
        }
    }
}

/// Everything the console renders, derived from the cache at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct AuctionView {
    pub auction_id: String,
    /// False until the first snapshot lands.
    pub loaded: bool,
    pub live: LiveAuctionState,
    /// Every player in server order.
    pub players: Vec<Player>,
    pub current_player: Option<Player>,
    pub leading_team: Option<String>,
    pub derived: DerivedViews,
    pub increment: Amount,
    pub next_bid: Amount,
    pub bid_pending: bool,
}

/// A player just went SOLD or UNSOLD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleOutcome {
    pub status: AuctionStatus,
    pub player_name: Option<String>,
    pub team_name: Option<String>,
    pub amount: Amount,
}

impl SaleOutcome {
    pub fn headline(&self) -> String {
        let player = self.player_name.as_deref().unwrap_or("Player");
        match (self.status, self.team_name.as_deref()) {
            (AuctionStatus::Sold, Some(team)) => {
                format!("SOLD! {player} to {team} for {}L", self.amount)
            }
            (AuctionStatus::Sold, None) => format!("SOLD! {player} for {}L", self.amount),
            _ => format!("UNSOLD: {player}"),
        }
    }
}

/// Updates pushed from the app loop to the console.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    ConnectionStatus(ConnectionStatus),
    View(Box<AuctionView>),
    Outcome(SaleOutcome),
    /// Informational line for the status bar.
    Notice(String),
    /// A refused action or failed request.
    Error(String),
}

/// Operator input forwarded from the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    StartPlayer(String),
    StartRandom { category: String },
    StartRandomUnsold,
    PlaceBid(String),
    UndoBid,
    Sell,
    Unsell,
    TogglePause,
    ResetRound,
    AdjustIncrement(i64),
    /// Broadcast `data_update` so every client re-fetches.
    Refresh,
    /// Re-fetch the snapshot for this client only.
    Reload,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_headlines() {
        let mut outcome = SaleOutcome {
            status: AuctionStatus::Sold,
            player_name: Some("Opener".into()),
            team_name: Some("Strikers".into()),
            amount: 120,
        };
        assert_eq!(outcome.headline(), "SOLD! Opener to Strikers for 120L");
        outcome.status = AuctionStatus::Unsold;
        assert_eq!(outcome.headline(), "UNSOLD: Opener");
    }
}
