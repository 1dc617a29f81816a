// Subcommand dispatch: directory, login, setup, and live sessions.
//
// Directory and setup commands are one-shot REST calls that print a short
// report. Setup changes end with a `data_update` nudge so open consoles and
// viewers re-fetch.

use anyhow::{bail, Context, Result};
use tracing::info;

use gavel_app::api::AuctionApi;
use gavel_app::auth::{self, AuthOutcome};
use gavel_app::snapshot::SnapshotSource;
use gavel_core::config::Config;
use gavel_core::db::LocalStore;
use gavel_core::directory::{
    filter_auctions, filter_players, generate_access_code, parse_label_list, tab_counts,
    DirectoryTab,
};
use gavel_core::model::{
    Amount, Auction, AuctionUpdate, Disposition, NewAuction, NewPlayer, NewTeam, Player,
};
use gavel_core::views::{DerivedViews, SetupTotals};

use crate::cli::Command;
use crate::session;
use crate::tui::Mode;

pub struct CommandContext {
    pub config: Config,
    pub api: AuctionApi,
    pub store: LocalStore,
}

pub async fn run(ctx: CommandContext, command: Command) -> Result<()> {
    match command {
        Command::Watch { auction_id } => {
            let id = resolve_auction_id(auction_id, ctx.store.last_auction()?)?;
            ctx.store.set_last_auction(&id)?;
            session::run_session(&ctx.config, ctx.api.clone(), &id, Mode::Viewer).await
        }
        Command::Console {
            auction_id,
            password,
        } => {
            let id = resolve_auction_id(auction_id, ctx.store.last_auction()?)?;
            ensure_console_access(&ctx, &id, password.as_deref()).await?;
            ctx.store.set_last_auction(&id)?;
            session::run_session(&ctx.config, ctx.api.clone(), &id, Mode::Console).await
        }
        Command::Login {
            auction_id,
            password,
        } => {
            match auth::login_admin(&ctx.api, &ctx.store, &auction_id, &password).await? {
                AuthOutcome::Granted => println!("Admin access granted for {auction_id}"),
                AuthOutcome::Denied => bail!("Invalid password for auction {auction_id}"),
            }
            Ok(())
        }
        Command::SuperLogin { password } => {
            match auth::login_super_admin(&ctx.api, &ctx.store, &password).await? {
                AuthOutcome::Granted => println!("Super admin access granted"),
                AuthOutcome::Denied => bail!("Invalid super admin password"),
            }
            Ok(())
        }
        Command::Logout => {
            auth::logout(&ctx.store)?;
            println!("Logged out");
            Ok(())
        }
        Command::Auctions { completed, search } => list_auctions(&ctx, completed, &search).await,
        Command::Create {
            name,
            access_code,
            categories,
            roles,
        } => {
            require_super_admin(&ctx.store)?;
            let access_code = match access_code {
                Some(code) => validate_access_code(&code)?,
                None => generate_access_code(),
            };
            let auction = NewAuction {
                name: require_name(&name)?,
                access_code,
                categories: parse_label_list(&categories),
                roles: parse_label_list(&roles),
            };
            ctx.api
                .create_auction(&auction)
                .await
                .context("creating auction")?;
            info!("created auction {}", auction.name);
            println!(
                "Created \"{}\" with access code {}",
                auction.name, auction.access_code
            );
            Ok(())
        }
        Command::Update {
            id,
            name,
            access_code,
            categories,
            roles,
        } => {
            require_super_admin(&ctx.store)?;
            let update = AuctionUpdate {
                is_active: None,
                name: name.as_deref().map(require_name).transpose()?,
                access_code: access_code
                    .as_deref()
                    .map(validate_access_code)
                    .transpose()?,
                categories: categories.as_deref().map(parse_label_list),
                roles: roles.as_deref().map(parse_label_list),
            };
            if update == AuctionUpdate::default() {
                bail!("Nothing to update");
            }
            ctx.api
                .update_auction(&id, &update)
                .await
                .context("updating auction")?;
            println!("Updated auction {id}");
            Ok(())
        }
        Command::Toggle { id } => {
            require_super_admin(&ctx.store)?;
            let auctions = ctx.api.list_auctions().await.context("listing auctions")?;
            let Some(auction) = auctions.iter().find(|a| a.id == id) else {
                bail!("No auction with id {id}");
            };
            let active = !auction.is_active;
            ctx.api
                .set_auction_active(&id, active)
                .await
                .context("toggling auction")?;
            println!(
                "\"{}\" is now {}",
                auction.name,
                if active { "active" } else { "completed" }
            );
            Ok(())
        }
        Command::Delete { id } => {
            require_super_admin(&ctx.store)?;
            ctx.api
                .delete_auction(&id)
                .await
                .context("deleting auction")?;
            println!("Deleted auction {id}");
            Ok(())
        }
        Command::Players {
            auction_id,
            category,
            search,
        } => list_players(&ctx, &auction_id, category.as_deref(), &search).await,
        Command::AddTeam {
            auction_id,
            name,
            budget,
            color,
        } => {
            require_admin(&ctx.store, &auction_id)?;
            if budget <= 0 {
                bail!("Budget must be positive");
            }
            let team = NewTeam {
                auction_id: auction_id.clone(),
                name: require_name(&name)?,
                budget,
                color,
            };
            let created = ctx.api.create_team(&team).await.context("adding team")?;
            match created {
                Some(t) => println!("Added team {} ({})", t.name, t.id),
                None => println!("Added team {}", team.name),
            }
            announce_change(&ctx, &auction_id).await;
            Ok(())
        }
        Command::RemoveTeam {
            auction_id,
            team_id,
        } => {
            require_admin(&ctx.store, &auction_id)?;
            ctx.api
                .delete_team(&team_id)
                .await
                .context("removing team")?;
            println!("Removed team {team_id}");
            announce_change(&ctx, &auction_id).await;
            Ok(())
        }
        Command::AddPlayer {
            auction_id,
            name,
            role,
            base_price,
            category,
        } => {
            require_admin(&ctx.store, &auction_id)?;
            if base_price < 0 {
                bail!("Base price cannot be negative");
            }
            let player = NewPlayer {
                auction_id: auction_id.clone(),
                name: require_name(&name)?,
                role: role.trim().to_string(),
                category: category.trim().to_string(),
                base_price,
            };
            let created = ctx
                .api
                .create_player(&player)
                .await
                .context("adding player")?;
            match created {
                Some(p) => println!("Added player {} ({})", p.name, p.id),
                None => println!("Added player {}", player.name),
            }
            announce_change(&ctx, &auction_id).await;
            Ok(())
        }
        Command::RemovePlayer {
            auction_id,
            player_id,
        } => {
            require_admin(&ctx.store, &auction_id)?;
            ctx.api
                .delete_player(&player_id)
                .await
                .context("removing player")?;
            println!("Removed player {player_id}");
            announce_change(&ctx, &auction_id).await;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

/// Open the console with a stored grant, as super admin, or with a password.
async fn ensure_console_access(
    ctx: &CommandContext,
    auction_id: &str,
    password: Option<&str>,
) -> Result<()> {
    if auth::has_admin_access(&ctx.store, auction_id)? {
        auth::enter_as_super_admin(&ctx.store, auction_id)?;
        return Ok(());
    }
    let Some(password) = password else {
        bail!("Admin access required: run `gavel login {auction_id} <password>` or pass --password");
    };
    match auth::login_admin(&ctx.api, &ctx.store, auction_id, password).await? {
        AuthOutcome::Granted => Ok(()),
        AuthOutcome::Denied => bail!("Invalid password for auction {auction_id}"),
    }
}

fn require_super_admin(store: &LocalStore) -> Result<()> {
    if !store.is_super_admin()? {
        bail!("Super admin access required: run `gavel super-login <password>`");
    }
    Ok(())
}

fn require_admin(store: &LocalStore, auction_id: &str) -> Result<()> {
    if !auth::has_admin_access(store, auction_id)? {
        bail!("Admin access required for auction {auction_id}");
    }
    Ok(())
}

async fn announce_change(ctx: &CommandContext, auction_id: &str) {
    if !session::nudge_subscribers(&ctx.config, auction_id).await {
        println!("Saved, but open screens were not notified; they will catch up on reload");
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

async fn list_auctions(ctx: &CommandContext, completed: bool, search: &str) -> Result<()> {
    let auctions = ctx.api.list_auctions().await.context("listing auctions")?;
    let tab = if completed {
        DirectoryTab::Completed
    } else {
        DirectoryTab::Active
    };
    let (active, done) = tab_counts(&auctions);
    println!("Active ({active}) | Completed ({done})");

    let show_codes = ctx.store.is_super_admin()?;
    let shown = filter_auctions(&auctions, tab, search);
    if shown.is_empty() {
        println!("No {} auctions", tab.label().to_lowercase());
    }
    for auction in shown {
        println!("{}", format_auction_line(auction, show_codes));
    }
    Ok(())
}

async fn list_players(
    ctx: &CommandContext,
    auction_id: &str,
    category: Option<&str>,
    search: &str,
) -> Result<()> {
    let snapshot = ctx
        .api
        .load_snapshot(auction_id)
        .await
        .context("loading auction data")?;
    let views = DerivedViews::build(&snapshot.teams, &snapshot.players, snapshot.config.as_ref());
    println!("{}", format_totals(&views.totals));

    for player in filter_players(&snapshot.players, category, search) {
        let team = player
            .sold_to
            .as_deref()
            .and_then(|id| views.standing(id))
            .map(|s| s.name.as_str());
        println!("{}", format_player_line(player, team));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Explicit id, else the last auction opened on this machine.
pub fn resolve_auction_id(explicit: Option<String>, last: Option<String>) -> Result<String> {
    explicit
        .or(last)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .context("No auction id given and no previous auction to reopen")
}

/// A typed access code, kept as written apart from surrounding whitespace.
pub fn validate_access_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.is_empty() {
        bail!("Access code cannot be blank");
    }
    Ok(code.to_string())
}

fn require_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        bail!("Name cannot be empty");
    }
    Ok(name.to_string())
}

pub fn format_auction_line(auction: &Auction, show_code: bool) -> String {
    let mut line = format!("{}  {}", auction.id, auction.name);
    if let Some(created) = auction.created_at {
        line.push_str(&format!("  (created {})", created.format("%Y-%m-%d")));
    }
    if show_code {
        if let Some(code) = &auction.access_code {
            line.push_str(&format!("  code {code}"));
        }
    }
    line
}

pub fn format_player_line(player: &Player, team_name: Option<&str>) -> String {
    let status = match player.disposition() {
        Disposition::Queued => "open".to_string(),
        Disposition::Unsold => "unsold".to_string(),
        Disposition::Sold => {
            let price = player.sold_price.map(format_amount).unwrap_or_default();
            match team_name {
                Some(team) => format!("sold to {team} for {price}"),
                None => format!("sold for {price}"),
            }
        }
    };
    format!(
        "{:<24} {:<12} {:<14} {:>6}  {}",
        player.name,
        player.role,
        player.category_label(),
        format_amount(player.base_price),
        status
    )
}

pub fn format_totals(totals: &SetupTotals) -> String {
    format!(
        "Teams: {}  Players: {}  Budget: {}  Spent: {}",
        totals.teams,
        totals.players,
        format_amount(totals.total_budget),
        format_amount(totals.total_spent)
    )
}

fn format_amount(value: Amount) -> String {
    format!("{value}L")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
