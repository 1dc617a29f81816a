// Auction data model: players, teams, live state, configuration.
//
// Every entity here is owned by the auction server. The client only ever
// holds a cached replica decoded from REST snapshots and push events, so
// the serde attributes mirror the server's JSON (camelCase keys, `_id`
// identifiers).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Money in the auction's currency unit ("L").
pub type Amount = i64;

/// An amount as the server may send it. Integers are the norm; a fractional
/// value is rounded to the nearest whole unit.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireAmount {
    Whole(i64),
    Fractional(f64),
}

impl From<WireAmount> for Amount {
    fn from(w: WireAmount) -> Self {
        match w {
            WireAmount::Whole(v) => v,
            WireAmount::Fractional(v) => v.round() as Amount,
        }
    }
}

fn amount<'de, D: Deserializer<'de>>(d: D) -> Result<Amount, D::Error> {
    WireAmount::deserialize(d).map(Amount::from)
}

fn optional_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Amount>, D::Error> {
    Option::<WireAmount>::deserialize(d).map(|w| w.map(Amount::from))
}

/// Category label used when a player carries no category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Category order used when the auction config has not been loaded yet.
pub const DEFAULT_CATEGORIES: &[&str] = &["Marquee", "Set 1", "Set 2", "Set 3", "Set 4"];

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "amount")]
    pub base_price: Amount,
    #[serde(default)]
    pub is_sold: bool,
    #[serde(default)]
    pub is_unsold: bool,
    #[serde(default)]
    pub sold_to: Option<String>,
    #[serde(default, deserialize_with = "optional_amount")]
    pub sold_price: Option<Amount>,
}

/// Where a player currently sits in the auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not yet sold or passed; still in the open queue.
    Queued,
    Sold,
    Unsold,
}

impl Player {
    /// Classify the player. A payload that flags both sold and unsold is
    /// treated as sold so that queue/unsold/sold stay disjoint.
    pub fn disposition(&self) -> Disposition {
        if self.is_sold {
            Disposition::Sold
        } else if self.is_unsold {
            Disposition::Unsold
        } else {
            Disposition::Queued
        }
    }

    /// True when the sold/unsold flags and sale fields agree with each other.
    pub fn is_consistent(&self) -> bool {
        if self.is_sold && self.is_unsold {
            return false;
        }
        if self.is_sold {
            return self.sold_to.is_some() && self.sold_price.is_some();
        }
        true
    }

    /// Category label with the empty/missing case folded into
    /// [`UNCATEGORIZED`].
    pub fn category_label(&self) -> &str {
        match self.category.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => UNCATEGORIZED,
        }
    }
}

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// One entry of a team's acquired-player list. The server sends either a
/// bare player id or the populated player document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SquadEntry {
    Id(String),
    Player(Box<Player>),
}

impl SquadEntry {
    pub fn player_id(&self) -> &str {
        match self {
            SquadEntry::Id(id) => id,
            SquadEntry::Player(p) => &p.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "amount")]
    pub budget: Amount,
    /// Server-maintained running total. Not used for purse display; see
    /// `views::team_purse`.
    #[serde(default, deserialize_with = "amount")]
    pub spent: Amount,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub players: Vec<SquadEntry>,
}

// ---------------------------------------------------------------------------
// Live auction state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuctionStatus {
    #[default]
    Idle,
    Active,
    Sold,
    Unsold,
    Paused,
}

impl AuctionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AuctionStatus::Idle => "IDLE",
            AuctionStatus::Active => "ACTIVE",
            AuctionStatus::Sold => "SOLD",
            AuctionStatus::Unsold => "UNSOLD",
            AuctionStatus::Paused => "PAUSED",
        }
    }
}

/// What is happening on the block right now. Always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveAuctionState {
    #[serde(default, deserialize_with = "amount")]
    pub current_bid: Amount,
    #[serde(default)]
    pub leading_team_id: Option<String>,
    #[serde(default)]
    pub current_player_id: Option<String>,
    #[serde(default)]
    pub status: AuctionStatus,
}

// ---------------------------------------------------------------------------
// Configuration and directory entries
// ---------------------------------------------------------------------------

/// Per-auction labels that scope grouping and form choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionConfig {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AuctionConfig {
    /// Configured category order, or the built-in order when none is set.
    pub fn category_order(&self) -> Vec<String> {
        if self.categories.is_empty() {
            DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
        } else {
            self.categories.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub config: AuctionConfig,
}

/// Full read model returned by `GET /api/init/{auctionId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub live_state: Option<LiveAuctionState>,
    #[serde(default)]
    pub config: Option<AuctionConfig>,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuction {
    pub name: String,
    pub access_code: String,
    pub categories: Vec<String>,
    pub roles: Vec<String>,
}

/// Partial update for `PUT /api/auctions/{id}`; unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub auction_id: String,
    pub name: String,
    pub budget: Amount,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub auction_id: String,
    pub name: String,
    pub role: String,
    pub category: String,
    pub base_price: Amount,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn player_decodes_server_document() {
        let p: Player = serde_json::from_value(json!({
            "_id": "p1",
            "name": "Rohit",
            "role": "Batsman",
            "category": "Marquee",
            "basePrice": 200,
            "isSold": true,
            "isUnsold": false,
            "soldTo": "t1",
            "soldPrice": 450,
            "__v": 0
        }))
        .unwrap();
        assert_eq!(p.id, "p1");
        assert_eq!(p.base_price, 200);
        assert_eq!(p.sold_to.as_deref(), Some("t1"));
        assert_eq!(p.sold_price, Some(450));
        assert_eq!(p.disposition(), Disposition::Sold);
        assert!(p.is_consistent());
    }

    #[test]
    fn player_missing_optional_fields_defaults_to_queued() {
        let p: Player = serde_json::from_value(json!({"_id": "p2", "name": "X"})).unwrap();
        assert_eq!(p.disposition(), Disposition::Queued);
        assert_eq!(p.category_label(), UNCATEGORIZED);
        assert_eq!(p.base_price, 0);
    }

    #[test]
    fn sold_and_unsold_flags_resolve_to_sold() {
        let p: Player = serde_json::from_value(json!({
            "_id": "p3", "name": "Y", "isSold": true, "isUnsold": true,
            "soldTo": "t1", "soldPrice": 10
        }))
        .unwrap();
        assert!(!p.is_consistent());
        assert_eq!(p.disposition(), Disposition::Sold);
    }

    #[test]
    fn sold_without_price_is_inconsistent() {
        let p: Player =
            serde_json::from_value(json!({"_id": "p4", "name": "Z", "isSold": true})).unwrap();
        assert!(!p.is_consistent());
    }

    #[test]
    fn blank_category_is_uncategorized() {
        let p: Player =
            serde_json::from_value(json!({"_id": "p5", "name": "Q", "category": "  "})).unwrap();
        assert_eq!(p.category_label(), UNCATEGORIZED);
    }

    #[test]
    fn squad_entries_accept_ids_and_documents() {
        let t: Team = serde_json::from_value(json!({
            "_id": "t1",
            "name": "Strikers",
            "budget": 1000,
            "spent": 300,
            "color": "#3B82F6",
            "players": ["p1", {"_id": "p2", "name": "B", "soldPrice": 100, "isSold": true}]
        }))
        .unwrap();
        assert_eq!(t.players.len(), 2);
        assert_eq!(t.players[0].player_id(), "p1");
        assert_eq!(t.players[1].player_id(), "p2");
        assert!(matches!(t.players[1], SquadEntry::Player(_)));
    }

    #[test]
    fn live_state_status_uses_uppercase_names() {
        let s: LiveAuctionState = serde_json::from_value(json!({
            "currentBid": 120,
            "leadingTeamId": null,
            "currentPlayerId": "p1",
            "status": "PAUSED"
        }))
        .unwrap();
        assert_eq!(s.status, AuctionStatus::Paused);
        assert!(s.leading_team_id.is_none());

        let back = serde_json::to_value(&s).unwrap();
        assert_eq!(back["status"], "PAUSED");
        assert_eq!(back["currentBid"], 120);
    }

    #[test]
    fn live_state_default_is_idle() {
        let s = LiveAuctionState::default();
        assert_eq!(s.status, AuctionStatus::Idle);
        assert_eq!(s.current_bid, 0);
    }

    #[test]
    fn snapshot_tolerates_missing_optional_sections() {
        let snap: Snapshot = serde_json::from_value(json!({"teams": [], "players": []})).unwrap();
        assert!(snap.live_state.is_none());
        assert!(snap.config.is_none());
    }

    #[test]
    fn fractional_amounts_round_instead_of_failing() {
        let snap: Snapshot = serde_json::from_str(
            r#"{"teams":[],"players":[{"_id":"p1","name":"A","basePrice":2.5}]}"#,
        )
        .unwrap();
        assert_eq!(snap.players[0].base_price, 3);

        let t: Team = serde_json::from_value(json!({
            "_id": "t1", "name": "Strikers", "budget": 999.6, "spent": 0.4
        }))
        .unwrap();
        assert_eq!((t.budget, t.spent), (1000, 0));

        let p: Player = serde_json::from_value(json!({
            "_id": "p2", "name": "B", "isSold": true, "soldTo": "t1", "soldPrice": 120.2
        }))
        .unwrap();
        assert_eq!(p.sold_price, Some(120));

        let s: LiveAuctionState =
            serde_json::from_value(json!({"currentBid": 55.5})).unwrap();
        assert_eq!(s.current_bid, 56);
    }

    #[test]
    fn auction_flattens_config_labels() {
        let a: Auction = serde_json::from_value(json!({
            "_id": "a1",
            "name": "Premier League 2026",
            "accessCode": "XK29QF",
            "isActive": true,
            "createdAt": "2026-03-01T10:00:00.000Z",
            "categories": ["Marquee", "Set 1"],
            "roles": ["Batsman"]
        }))
        .unwrap();
        assert_eq!(a.config.categories, vec!["Marquee", "Set 1"]);
        assert!(a.created_at.is_some());
    }

    #[test]
    fn auction_update_omits_unset_fields() {
        let update = AuctionUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"isActive": false}));
    }

    #[test]
    fn category_order_falls_back_to_defaults() {
        let cfg = AuctionConfig::default();
        assert_eq!(cfg.category_order()[0], "Marquee");
        let cfg = AuctionConfig {
            categories: vec!["Icons".into()],
            roles: vec![],
        };
        assert_eq!(cfg.category_order(), vec!["Icons".to_string()]);
    }
}
