// Command-line options.

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "gavel", about = "Live team auction viewer and auctioneer console")]
pub struct GavelOpt {
    #[structopt(long, help("Server base URL, overriding config/gavel.toml"))]
    pub server: Option<String>,
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, StructOpt)]
pub enum Command {
    /// Watch an auction live (read-only)
    Watch {
        #[structopt(help("Auction id; defaults to the last one opened"))]
        auction_id: Option<String>,
    },
    /// Run the auctioneer console
    Console {
        #[structopt(help("Auction id; defaults to the last one opened"))]
        auction_id: Option<String>,
        #[structopt(long, help("Admin password, if this client has no stored grant"))]
        password: Option<String>,
    },
    /// Log in as an auction's admin
    Login { auction_id: String, password: String },
    /// Log in as super admin
    SuperLogin { password: String },
    /// Forget all stored admin grants
    Logout,
    /// List auctions
    Auctions {
        #[structopt(long, help("Show completed auctions instead of active ones"))]
        completed: bool,
        #[structopt(long, default_value = "", help("Case-insensitive name filter"))]
        search: String,
    },
    /// Create an auction (super admin)
    Create {
        name: String,
        #[structopt(long, help("Access code, any text; a six-character code is generated when omitted"))]
        access_code: Option<String>,
        #[structopt(long, default_value = "", help("Comma-separated category order"))]
        categories: String,
        #[structopt(long, default_value = "", help("Comma-separated roles"))]
        roles: String,
    },
    /// Edit an auction (super admin)
    Update {
        id: String,
        #[structopt(long)]
        name: Option<String>,
        #[structopt(long)]
        access_code: Option<String>,
        #[structopt(long, help("Comma-separated category order"))]
        categories: Option<String>,
        #[structopt(long, help("Comma-separated roles"))]
        roles: Option<String>,
    },
    /// Flip an auction between active and completed (super admin)
    Toggle { id: String },
    /// Delete an auction (super admin)
    Delete { id: String },
    /// List an auction's players and setup totals
    Players {
        auction_id: String,
        #[structopt(long)]
        category: Option<String>,
        #[structopt(long, default_value = "")]
        search: String,
    },
    /// Add a team to an auction (admin)
    AddTeam {
        auction_id: String,
        name: String,
        budget: i64,
        #[structopt(long, default_value = "#3b82f6")]
        color: String,
    },
    /// Remove a team (admin)
    RemoveTeam { auction_id: String, team_id: String },
    /// Add a player to an auction (admin)
    AddPlayer {
        auction_id: String,
        name: String,
        role: String,
        base_price: i64,
        #[structopt(long, default_value = "")]
        category: String,
    },
    /// Remove a player (admin)
    RemovePlayer { auction_id: String, player_id: String },
}
