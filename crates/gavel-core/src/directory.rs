// Auction directory and setup helpers: tab/search filtering, label list
// parsing for the create/edit forms, roster filtering, and access codes.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::model::{Auction, Player};

/// Which half of the auction directory is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DirectoryTab {
    #[default]
    Active,
    Completed,
}

impl DirectoryTab {
    pub fn matches(&self, auction: &Auction) -> bool {
        match self {
            DirectoryTab::Active => auction.is_active,
            DirectoryTab::Completed => !auction.is_active,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DirectoryTab::Active => "Active",
            DirectoryTab::Completed => "Completed",
        }
    }
}

/// Auctions on `tab` whose name contains `search` (case-insensitive).
pub fn filter_auctions<'a>(auctions: &'a [Auction], tab: DirectoryTab, search: &str) -> Vec<&'a Auction> {
    let needle = search.trim().to_lowercase();
    auctions
        .iter()
        .filter(|a| tab.matches(a))
        .filter(|a| needle.is_empty() || a.name.to_lowercase().contains(&needle))
        .collect()
}

/// (active, completed) counts for the tab headers.
pub fn tab_counts(auctions: &[Auction]) -> (usize, usize) {
    let active = auctions.iter().filter(|a| a.is_active).count();
    (active, auctions.len() - active)
}

/// Parse a comma-separated label list: entries are trimmed and empty
/// entries dropped.
pub fn parse_label_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Roster filter used by the setup flow: optional exact category plus a
/// case-insensitive name search.
pub fn filter_players<'a>(players: &'a [Player], category: Option<&str>, search: &str) -> Vec<&'a Player> {
    let needle = search.trim().to_lowercase();
    players
        .iter()
        .filter(|p| category.map_or(true, |c| p.category_label() == c))
        .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
        .collect()
}

/// Length of generated auction access codes.
pub const ACCESS_CODE_LEN: usize = 6;

/// Fresh six-character uppercase alphanumeric access code.
pub fn generate_access_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_CODE_LEN)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}
