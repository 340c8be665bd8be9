//! Volume Booster CLI
//!
//! Inspect and edit the rule store, and replay resolution passes for a tab.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vb_core::edit::{parse_boost_input, AccountEdit, RuleEdit};
use vb_core::probe::{PlayerSnapshot, VideoDetails};
use vb_core::{normalize, AccountKey, Boost, EditError, Matcher};
use vb_engine::{
    spawn_probe_context, BoostResolver, EngineConfig, GainStage, Host, JsonFileStore, LiveProbe,
    PageContext, PassOutcome, PersistenceWriter, RuleStore, ScriptedPlayer, SettingsService,
};

#[derive(Parser)]
#[command(name = "vb-cli")]
#[command(about = "Volume Booster rule store and resolution tools")]
struct Cli {
    /// Settings store file
    #[arg(short, long, global = true, default_value = "volume-booster.json")]
    store: PathBuf,

    /// Engine config file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized form of an address
    Normalize { address: String },

    /// Show which saved rule covers an address
    Match { address: String },

    /// Replay one tab navigating through the given addresses
    Resolve {
        #[arg(required = true)]
        addresses: Vec<String>,

        /// Content id the player reports as live
        #[arg(long)]
        live: Option<String>,

        /// Treat every address as a full page load instead of client-side navigation
        #[arg(long)]
        reload: bool,
    },

    /// Save a rule
    Set { key: String, boost: String },

    /// Delete a rule
    Remove { key: String },

    /// Move a rule to a new key
    Rename { old: String, new: String },

    /// Edit account rules
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Configure the live broadcast override
    Live {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        #[arg(long)]
        disable: bool,

        /// Boost applied while live
        #[arg(long)]
        target: Option<String>,
    },

    /// Switch between the light and dark theme
    Theme,

    /// Switch the display language
    Language,

    /// Dump the store
    List,

    /// Delete every rule and preference
    Reset,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Save an account rule, e.g. `youtube:@channel 80`
    Set { account: String, boost: String },
    /// Delete an account rule
    Remove { account: String },
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start tokio runtime: {}", e))
        .and_then(|runtime| runtime.block_on(run(cli)));

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .await
            .map_err(|e| format!("Failed to load '{}': {}", path.display(), e))?,
        None => EngineConfig::default(),
    };
    let store: Arc<dyn RuleStore> = Arc::new(JsonFileStore::new(&cli.store));

    match cli.command {
        Commands::Normalize { address } => {
            println!("{}", normalize(&address));
            Ok(())
        }
        Commands::Match { address } => cmd_match(store.as_ref(), &address).await,
        Commands::Resolve {
            addresses,
            live,
            reload,
        } => cmd_resolve(store, &config, &addresses, live, reload).await,
        Commands::List => cmd_list(store.as_ref(), &cli.store).await,
        command => cmd_edit(store, &config, command).await,
    }
}

async fn cmd_match(store: &dyn RuleStore, address: &str) -> Result<(), String> {
    let snapshot = store
        .load()
        .await
        .map_err(|e| format!("Failed to read store: {}", e))?;
    let normalized = normalize(address);
    let matcher = Matcher::new(&snapshot.rule_settings);

    let mut matches = matcher.all_matches(normalized.as_str());
    match matches.next() {
        Some(found) => println!("{} -> {} ({})", normalized, found.key, found.boost),
        None => println!("{} -> no rule ({})", normalized, Boost::DEFAULT),
    }
    for shadowed in matches {
        println!("  also covered by {} ({})", shadowed.key, shadowed.boost);
    }
    Ok(())
}

async fn cmd_resolve(
    store: Arc<dyn RuleStore>,
    config: &EngineConfig,
    addresses: &[String],
    live: Option<String>,
    reload: bool,
) -> Result<(), String> {
    let player = Arc::new(ScriptedPlayer::new(PlayerSnapshot {
        player_api: live.map(|id| VideoDetails {
            video_id: Some(id),
            is_live_content: true,
        }),
        initial_response: None,
    }));
    let (bridge, _context) = spawn_probe_context(player);
    let probe = Arc::new(LiveProbe::new(Arc::new(bridge), config.probe.clone()));
    let gain = Arc::new(GainStage::new());

    let mut resolver: Option<BoostResolver> = None;
    for address in addresses {
        let page = PageContext::new(address.as_str());
        let current = match resolver.take() {
            Some(existing) if !reload => {
                existing.set_page(page).await;
                existing
            }
            _ => BoostResolver::new(page, store.clone(), Some(probe.clone()), gain.clone()),
        };

        match current.resolve().await {
            PassOutcome::Applied(resolution) => println!(
                "{:<48} {:>5}  {:?}{}",
                normalize(address).as_str(),
                resolution.boost.to_string(),
                resolution.cause,
                resolution
                    .matched_key
                    .map(|key| format!(" [{}]", key))
                    .unwrap_or_default()
            ),
            PassOutcome::Unsupported => println!("{:<48} unsupported", address),
            PassOutcome::Superseded => println!("{:<48} superseded", address),
            PassOutcome::Abandoned => {
                return Err(format!("Resolution for '{}' abandoned", address));
            }
        }
        resolver = Some(current);
    }

    println!("Gain: {:.2}", gain.gain());
    Ok(())
}

async fn cmd_list(store: &dyn RuleStore, path: &Path) -> Result<(), String> {
    let snapshot = store
        .load()
        .await
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let json = snapshot
        .to_json_pretty()
        .map_err(|e| format!("Failed to encode store: {}", e))?;
    println!("{}", json);
    Ok(())
}

async fn cmd_edit(
    store: Arc<dyn RuleStore>,
    config: &EngineConfig,
    command: Commands,
) -> Result<(), String> {
    let host = Arc::new(Host::new(store.clone(), None));
    let writer = PersistenceWriter::spawn(store, config.writer.clone());
    let service = SettingsService::new(host, writer);

    match command {
        Commands::Set { key, boost } => {
            let edit = RuleEdit::parse(&key, &boost).map_err(|e| e.to_string())?;
            let key = service
                .set_rule(&edit.key, edit.boost)
                .await
                .map_err(|e| e.to_string())?;
            println!("Saved {} = {}", key, edit.boost);
        }
        Commands::Remove { key } => {
            if service.remove_rule(&key).await.map_err(|e| e.to_string())? {
                println!("Removed {}", key);
            } else {
                println!("No rule for {}", key);
            }
        }
        Commands::Rename { old, new } => {
            if service
                .rename_rule(&old, &new)
                .await
                .map_err(|e| e.to_string())?
            {
                println!("Renamed {} -> {}", old, new);
            } else {
                println!("Nothing renamed");
            }
        }
        Commands::Account { command } => match command {
            AccountCommands::Set { account, boost } => {
                let edit = AccountEdit::parse(&account, &boost).map_err(|e| e.to_string())?;
                service
                    .set_account_rule(&edit.key, edit.boost)
                    .await
                    .map_err(|e| e.to_string())?;
                println!("Saved {} = {}", edit.key, edit.boost);
            }
            AccountCommands::Remove { account } => {
                let key: AccountKey = account
                    .trim()
                    .parse()
                    .map_err(|e: EditError| e.to_string())?;
                if service
                    .remove_account_rule(&key)
                    .await
                    .map_err(|e| e.to_string())?
                {
                    println!("Removed {}", key);
                } else {
                    println!("No account rule for {}", key);
                }
            }
        },
        Commands::Live {
            enable,
            disable,
            target,
        } => {
            let target = target
                .as_deref()
                .map(parse_boost_input)
                .transpose()
                .map_err(|e| e.to_string())?;
            let current = service.list().await.map_err(|e| e.to_string())?;
            let enabled = if enable {
                true
            } else if disable {
                false
            } else {
                current.live_override_settings.enabled
            };
            let settings = service
                .set_live_override(enabled, target)
                .await
                .map_err(|e| e.to_string())?;
            println!(
                "Live override {} (target {})",
                if settings.enabled { "enabled" } else { "disabled" },
                settings.target_volume
            );
        }
        Commands::Theme => {
            let theme = service.toggle_theme().await.map_err(|e| e.to_string())?;
            println!("Theme: {:?}", theme);
        }
        Commands::Language => {
            let language = service.toggle_language().await.map_err(|e| e.to_string())?;
            println!("Language: {:?}", language);
        }
        Commands::Reset => {
            service.reset_all().await.map_err(|e| e.to_string())?;
            println!("Store cleared");
        }
        Commands::Normalize { .. } | Commands::Match { .. } | Commands::Resolve { .. } | Commands::List => {}
    }

    service.writer().flush().await.map_err(|e| e.to_string())?;
    Ok(())
}
