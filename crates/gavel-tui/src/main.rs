// gavel entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Parse command-line options
// 3. Load and validate config
// 4. Open the local store
// 5. Build the REST client
// 6. Dispatch the subcommand

use anyhow::Context;
use structopt::StructOpt;
use tracing::{error, info};

use gavel_app::api::AuctionApi;
use gavel_core::config;
use gavel_core::db::LocalStore;
use gavel_tui::cli::GavelOpt;
use gavel_tui::commands::{self, CommandContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("gavel starting up");

    // 2. Parse options
    let opt = GavelOpt::from_args();

    // 3. Load config, applying the --server override
    let mut config = config::load_config().context("failed to load configuration")?;
    if let Some(server) = opt.server {
        config.server.base_url = server;
    }
    config::validate(&config).context("invalid configuration")?;
    info!("Config loaded: server={}", config.api_base());

    // 4. Open the local store
    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let store = LocalStore::open(&db_path.to_string_lossy()).context("failed to open local store")?;
    info!("Local store opened at {}", db_path.display());

    // 5. REST client
    let api = AuctionApi::from_config(&config).context("failed to build HTTP client")?;

    // 6. Dispatch
    let ctx = CommandContext { config, api, store };
    if let Err(e) = commands::run(ctx, opt.command).await {
        error!("command failed: {e:#}");
        return Err(e);
    }

    info!("gavel shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (the terminal belongs to the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("gavel.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gavel=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
