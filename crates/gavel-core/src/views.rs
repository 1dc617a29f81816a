// Derived views over the cached auction replica.
//
// Everything here is a pure projection of (teams, players, live state,
// config). `ViewCache` memoizes the heavier projections on the cache
// revision so that UI-only changes do not regroup the player list.

use std::collections::HashSet;

use tracing::debug;

use crate::model::{
    Amount, AuctionConfig, Disposition, LiveAuctionState, Player, SquadEntry, Team, UNCATEGORIZED,
};

// ---------------------------------------------------------------------------
// Player partitions
// ---------------------------------------------------------------------------

/// Players split by disposition. The three lists are disjoint and together
/// cover the input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partitions {
    pub queued: Vec<Player>,
    pub unsold: Vec<Player>,
    pub sold: Vec<Player>,
}

pub fn partition_players(players: &[Player]) -> Partitions {
    let mut parts = Partitions::default();
    for p in players {
        match p.disposition() {
            Disposition::Queued => parts.queued.push(p.clone()),
            Disposition::Unsold => parts.unsold.push(p.clone()),
            Disposition::Sold => parts.sold.push(p.clone()),
        }
    }
    parts
}

/// Viewer player-pool filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolFilter {
    #[default]
    Open,
    Sold,
    Unsold,
    All,
}

impl PoolFilter {
    pub fn matches(&self, player: &Player) -> bool {
        match self {
            PoolFilter::Open => player.disposition() == Disposition::Queued,
            PoolFilter::Sold => player.disposition() == Disposition::Sold,
            PoolFilter::Unsold => player.disposition() == Disposition::Unsold,
            PoolFilter::All => true,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            PoolFilter::Open => PoolFilter::Sold,
            PoolFilter::Sold => PoolFilter::Unsold,
            PoolFilter::Unsold => PoolFilter::All,
            PoolFilter::All => PoolFilter::Open,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PoolFilter::Open => "Open",
            PoolFilter::Sold => "Sold",
            PoolFilter::Unsold => "Unsold",
            PoolFilter::All => "All",
        }
    }
}

/// Players matching `filter` and, when given, `category`.
pub fn filter_pool<'a>(
    players: &'a [Player],
    filter: PoolFilter,
    category: Option<&str>,
) -> Vec<&'a Player> {
    players
        .iter()
        .filter(|p| filter.matches(p))
        .filter(|p| category.map_or(true, |c| p.category_label() == c))
        .collect()
}

// ---------------------------------------------------------------------------
// Category grouping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryGroup {
    pub category: String,
    pub players: Vec<Player>,
}

/// Group queued players by category.
///
/// Configured categories come first, in configured order (or the built-in
/// order when the config is missing or empty). Categories not in the config
/// follow in first-seen order, and players without a category land in a
/// trailing "Uncategorized" bucket. Empty groups are omitted.
pub fn group_queue_by_category(
    players: &[Player],
    config: Option<&AuctionConfig>,
) -> Vec<CategoryGroup> {
    let order = config.cloned().unwrap_or_default().category_order();

    let mut buckets: Vec<CategoryGroup> = Vec::new();
    for p in players
        .iter()
        .filter(|p| p.disposition() == Disposition::Queued)
    {
        let label = p.category_label();
        match buckets.iter_mut().find(|g| g.category == label) {
            Some(group) => group.players.push(p.clone()),
            None => buckets.push(CategoryGroup {
                category: label.to_string(),
                players: vec![p.clone()],
            }),
        }
    }

    let mut grouped = Vec::with_capacity(buckets.len());
    for cat in &order {
        if let Some(idx) = buckets.iter().position(|g| &g.category == cat) {
            grouped.push(buckets.remove(idx));
        }
    }
    let trailing = buckets
        .iter()
        .position(|g| g.category == UNCATEGORIZED)
        .map(|idx| buckets.remove(idx));
    grouped.extend(buckets);
    grouped.extend(trailing);
    grouped
}

/// Distinct category labels in the order they first appear in the player
/// list.
pub fn categories_seen(players: &[Player]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for p in players {
        let label = p.category_label();
        if !seen.iter().any(|c| c == label) {
            seen.push(label.to_string());
        }
    }
    seen
}

// ---------------------------------------------------------------------------
// Squads and purses
// ---------------------------------------------------------------------------

/// Resolve a team's squad entries into players, deduplicated by id.
///
/// Bare ids are looked up in `players` and dropped when unknown. Embedded
/// documents are replaced by the snapshot's copy when one exists.
pub fn resolve_squad(team: &Team, players: &[Player]) -> Vec<Player> {
    let mut seen = HashSet::new();
    let mut squad = Vec::new();
    for entry in &team.players {
        let id = entry.player_id();
        if seen.contains(id) {
            continue;
        }
        let resolved = match players.iter().find(|p| p.id == id) {
            Some(p) => Some(p.clone()),
            None => match entry {
                SquadEntry::Player(p) => Some(p.as_ref().clone()),
                SquadEntry::Id(_) => None,
            },
        };
        if let Some(p) = resolved {
            seen.insert(p.id.clone());
            squad.push(p);
        }
    }
    squad
}

/// A team's purse as shown to users and used for affordability checks.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamStanding {
    pub team_id: String,
    pub name: String,
    pub color: Option<String>,
    pub budget: Amount,
    pub spent: Amount,
    /// `budget - spent`; negative when a team has overspent.
    pub remaining: Amount,
    pub squad: Vec<Player>,
}

/// Compute the purse from the resolved squad: spent is the sum of sold
/// prices, not the server's running `spent` field.
pub fn team_purse(team: &Team, players: &[Player]) -> TeamStanding {
    let squad = resolve_squad(team, players);
    let spent: Amount = squad.iter().filter_map(|p| p.sold_price).sum();
    if spent != team.spent {
        debug!(
            "team {} purse diverges: squad total {} vs server spent {}",
            team.id, spent, team.spent
        );
    }
    TeamStanding {
        team_id: team.id.clone(),
        name: team.name.clone(),
        color: team.color.clone(),
        budget: team.budget,
        spent,
        remaining: team.budget - spent,
        squad,
    }
}

pub fn team_standings(teams: &[Team], players: &[Player]) -> Vec<TeamStanding> {
    teams.iter().map(|t| team_purse(t, players)).collect()
}

// ---------------------------------------------------------------------------
// Live lookups
// ---------------------------------------------------------------------------

pub fn current_player<'a>(live: &LiveAuctionState, players: &'a [Player]) -> Option<&'a Player> {
    let id = live.current_player_id.as_deref()?;
    players.iter().find(|p| p.id == id)
}

pub fn leading_team_name<'a>(live: &LiveAuctionState, teams: &'a [Team]) -> Option<&'a str> {
    let id = live.leading_team_id.as_deref()?;
    teams.iter().find(|t| t.id == id).map(|t| t.name.as_str())
}

/// Totals shown on the setup dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupTotals {
    pub total_budget: Amount,
    pub total_spent: Amount,
    pub teams: usize,
    pub players: usize,
}

pub fn setup_totals(standings: &[TeamStanding], player_count: usize) -> SetupTotals {
    SetupTotals {
        total_budget: standings.iter().map(|s| s.budget).sum(),
        total_spent: standings.iter().map(|s| s.spent).sum(),
        teams: standings.len(),
        players: player_count,
    }
}

// ---------------------------------------------------------------------------
// Memoization
// ---------------------------------------------------------------------------

/// Projections that only depend on cached data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedViews {
    pub queue: Vec<CategoryGroup>,
    pub partitions: Partitions,
    pub standings: Vec<TeamStanding>,
    pub categories: Vec<String>,
    pub totals: SetupTotals,
}

impl DerivedViews {
    pub fn build(teams: &[Team], players: &[Player], config: Option<&AuctionConfig>) -> Self {
        let standings = team_standings(teams, players);
        let totals = setup_totals(&standings, players.len());
        DerivedViews {
            queue: group_queue_by_category(players, config),
            partitions: partition_players(players),
            standings,
            categories: categories_seen(players),
            totals,
        }
    }

    pub fn standing(&self, team_id: &str) -> Option<&TeamStanding> {
        self.standings.iter().find(|s| s.team_id == team_id)
    }
}

/// Memoizes [`DerivedViews`] keyed on the cache revision.
#[derive(Debug, Default)]
pub struct ViewCache {
    entry: Option<(u64, DerivedViews)>,
    builds: u64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the views for `revision`, rebuilding only when the revision
    /// differs from the memoized one.
    pub fn get_or_build<F>(&mut self, revision: u64, build: F) -> &DerivedViews
    where
        F: FnOnce() -> DerivedViews,
    {
        if !matches!(&self.entry, Some((rev, _)) if *rev == revision) {
            self.entry = None;
        }
        let builds = &mut self.builds;
        let (_, views) = self.entry.get_or_insert_with(|| {
            *builds += 1;
            (revision, build())
        });
        views
    }

    /// Number of rebuilds performed so far.
    pub fn builds(&self) -> u64 {
        self.builds
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
