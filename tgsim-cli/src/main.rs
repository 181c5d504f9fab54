//! tgsim CLI - admin client for the Telegram chat-simulation backend.

mod commands;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tgsim_client::{Client, EntityId};
use tgsim_core::config::ClientConfig;
use tgsim_core::observability::{TracingConfig, init_tracing};
use tgsim_core::preferences::{Preferences, Theme, ViewMode};
use tgsim_core::providers::{FileStore, KeyValueStore, RealEnv};
use tgsim_core::session::SessionStore;

use crate::commands::Context;

/// tgsim - manage simulated bots and chats, and watch live metrics.
#[derive(Parser)]
#[command(name = "tgsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Backend base URL (overrides TGSIM_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Print JSON regardless of the saved view mode
    #[arg(long, global = true, conflicts_with = "table")]
    json: bool,

    /// Print tables regardless of the saved view mode
    #[arg(long, global = true)]
    table: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an API key and check it against the backend
    Login {
        /// API key issued by the backend
        #[arg(long)]
        api_key: String,
    },

    /// Forget the stored API key
    Logout,

    /// Show backend health
    Health,

    /// Manage bots
    Bots {
        #[command(subcommand)]
        action: BotsAction,
    },

    /// Inspect chats
    Chats {
        #[command(subcommand)]
        action: ChatsAction,
    },

    /// Show a metrics snapshot
    Metrics,

    /// Follow live metrics, polling when the stream is unavailable
    Watch {
        /// Poll only; do not open the realtime stream
        #[arg(long)]
        no_realtime: bool,

        /// Polling interval in seconds (overrides TGSIM_POLL_INTERVAL_SECS)
        #[arg(long)]
        poll_secs: Option<u64>,
    },

    /// Show or change saved preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum BotsAction {
    /// List all bots
    List,

    /// Show one bot
    Get {
        /// Bot ID
        id: String,
    },

    /// Create a bot
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Telegram username
        #[arg(short, long)]
        username: Option<String>,

        /// Persona description
        #[arg(short, long)]
        persona: Option<String>,
    },

    /// Delete a bot
    Delete {
        /// Bot ID
        id: String,
    },
}

#[derive(Subcommand)]
enum ChatsAction {
    /// List all chats
    List,
}

#[derive(Subcommand)]
enum PrefsAction {
    /// Print saved preferences
    Show,

    /// Change preferences
    Set {
        /// Listing view mode (table, json)
        #[arg(long)]
        view: Option<ViewMode>,

        /// Colour theme (system, light, dark)
        #[arg(long)]
        theme: Option<Theme>,
    },
}

fn setup_logging(verbosity: u8) -> Result<()> {
    let mut config = TracingConfig::from_env(&RealEnv::new());
    match verbosity {
        0 => {}
        1 => config.set_log_filter("info"),
        2 => config.set_log_filter("debug"),
        _ => config.set_log_filter("trace"),
    }
    init_tracing(config)
}

fn view_mode(json: bool, table: bool, prefs: &Preferences) -> ViewMode {
    if json {
        ViewMode::Json
    } else if table {
        ViewMode::Table
    } else {
        prefs.view_mode
    }
}

/// Build the API context: session, configuration and client.
fn connect(
    env: &RealEnv,
    store: &Arc<dyn KeyValueStore>,
    api_url: Option<String>,
    view: ViewMode,
) -> Result<Context> {
    let session = SessionStore::new(Arc::clone(store));
    if session.bootstrap(env) {
        tracing::info!("Using API key from TGSIM_API_KEY");
    }

    let mut config = ClientConfig::from_env(env);
    if let Some(api_url) = api_url {
        config = config.with_api_url(api_url);
    }
    let client = Client::from_config(&config, session.clone())
        .with_context(|| format!("Invalid API URL '{}'", config.api_url))?;

    Ok(Context {
        client,
        config,
        session,
        view,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        verbose,
        api_url,
        json,
        table,
        command,
    } = Cli::parse();
    setup_logging(verbose)?;

    let env = RealEnv::new();
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open_default(&env).context("Failed to locate the settings store")?,
    );
    let prefs = Preferences::load(store.as_ref());
    let view = view_mode(json, table, &prefs);

    match command {
        Commands::Version => commands::version::run(),
        Commands::Prefs { action } => match action {
            PrefsAction::Show => commands::prefs::show(store.as_ref(), view),
            PrefsAction::Set { view, theme } => commands::prefs::set(store.as_ref(), view, theme),
        },
        Commands::Login { api_key } => {
            let ctx = connect(&env, &store, api_url, view)?;
            commands::auth::login(&ctx, &api_key).await
        }
        Commands::Logout => commands::auth::logout(&connect(&env, &store, api_url, view)?),
        Commands::Health => commands::health::run(&connect(&env, &store, api_url, view)?).await,
        Commands::Bots { action } => {
            let ctx = connect(&env, &store, api_url, view)?;
            match action {
                BotsAction::List => commands::bots::list(&ctx).await,
                BotsAction::Get { id } => commands::bots::get(&ctx, &EntityId::from(id.as_str())).await,
                BotsAction::Create {
                    name,
                    username,
                    persona,
                } => commands::bots::create(&ctx, name, username, persona).await,
                BotsAction::Delete { id } => {
                    commands::bots::delete(&ctx, &EntityId::from(id.as_str())).await
                }
            }
        }
        Commands::Chats { action } => {
            let ctx = connect(&env, &store, api_url, view)?;
            match action {
                ChatsAction::List => commands::chats::list(&ctx).await,
            }
        }
        Commands::Metrics => commands::metrics::run(&connect(&env, &store, api_url, view)?).await,
        Commands::Watch {
            no_realtime,
            poll_secs,
        } => {
            let ctx = connect(&env, &store, api_url, view)?;
            commands::watch::run(&ctx, no_realtime, poll_secs).await
        }
    }
}
