//! CLI entry point for ollacord

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use ollacord_channels::ChannelManager;
use ollacord_core::bus::{InboundMessage, SelfIdentity};
use ollacord_core::config::{Config, ConfigLoader};
use ollacord_core::history::{ChannelKey, HistoryStore};
use ollacord_core::logging::{init_logging, WorkerGuard};
use ollacord_providers::build_provider;
use ollacord_relay::Relay;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Server id used for conversations started from the terminal
const CLI_SERVER_ID: &str = "cli";

#[derive(Parser)]
#[command(name = "ollacord")]
#[command(about = "Relay Discord conversations to a local language model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Connect to Discord and relay messages
    Run,
    /// Send one message through the relay without Discord
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Channel id for the conversation history
        #[arg(long, default_value = "local")]
        channel: String,
    },
    /// Show status information
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be set
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Onboard { force } => run_onboard(&config_loader, force),
        Commands::Run => {
            let (config, _guard) = load_config(&config_loader)?;
            run_relay(&config_loader, config).await
        }
        Commands::Ask { message, channel } => {
            let (config, _guard) = load_config(&config_loader)?;
            run_ask(config, &message, &channel).await
        }
        Commands::Status => {
            let (config, _guard) = load_config(&config_loader)?;
            run_status(&config_loader, &config);
            Ok(())
        }
    }
}

/// Load the configuration and start logging with it
fn load_config(loader: &ConfigLoader) -> Result<(Config, WorkerGuard)> {
    let config = loader.load()?;
    let guard = init_logging(&config.logging);
    Ok((config, guard))
}

fn run_onboard(loader: &ConfigLoader, force: bool) -> Result<()> {
    println!("{}", style("Welcome to ollacord!").bold().cyan());

    let config_path = loader.config_path();
    if config_path.exists() && !force {
        println!(
            "Configuration already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
        return Ok(());
    }

    loader.save(&Config::default())?;

    println!(
        "\n{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("\nSet your bot token, then run:");
    println!("  {} - Discord bot token", style("DISCORD_TOKEN=...").cyan());
    println!("  {} - Start relaying", style("ollacord run").cyan());
    println!(
        "  {} - Try the model locally",
        style("ollacord ask --message 'Hello!'").cyan()
    );

    Ok(())
}

async fn run_relay(loader: &ConfigLoader, config: Config) -> Result<()> {
    if let Err(e) = config.require_discord_token() {
        anyhow::bail!(
            "{}. Add it to {} or export DISCORD_TOKEN",
            e,
            loader.config_path().display()
        );
    }

    println!("{}", style("Starting ollacord...").bold().cyan());
    println!("Model: {}", config.provider.model);
    println!("Backend: {} ({})", config.provider.api_base, config.provider.kind);
    println!("History: {} turns per channel", config.relay.history_limit);

    let identity = SelfIdentity::new();
    let history = Arc::new(HistoryStore::new(config.relay.history_limit));
    let provider = build_provider(&config.provider)?;

    let (inbound_tx, inbound_rx) = mpsc::channel::<InboundMessage>(1024);
    let mut channel_manager = ChannelManager::new(config.clone(), identity.clone());
    channel_manager.set_inbound_sender(inbound_tx);
    channel_manager.initialize().await?;
    let channel_manager = Arc::new(channel_manager);

    let relay = Arc::new(
        Relay::new(provider, history, channel_manager.clone(), identity)
            .with_config(&config.relay),
    );
    let relay_handle = tokio::spawn(relay.run(inbound_rx));

    channel_manager.start_all().await?;
    info!("Relay running");
    println!(
        "\n{}",
        style("ollacord is running. Press Ctrl+C to stop.").green()
    );

    tokio::signal::ctrl_c().await?;
    println!("\n{}", style("Shutting down...").yellow());

    if let Err(e) = channel_manager.stop_all().await {
        error!("Failed to stop channels: {}", e);
    }
    relay_handle.abort();
    let _ = relay_handle.await;

    println!("{}", style("ollacord stopped.").green());
    Ok(())
}

async fn run_ask(config: Config, message: &str, channel: &str) -> Result<()> {
    let identity = SelfIdentity::new();
    let history = Arc::new(HistoryStore::new(config.relay.history_limit));
    let provider = build_provider(&config.provider)?;
    // Nothing is registered, so nothing can be sent to a platform
    let sink = Arc::new(ChannelManager::new(config.clone(), identity.clone()));

    let relay = Relay::new(provider, history, sink, identity).with_config(&config.relay);
    let key = ChannelKey::new(CLI_SERVER_ID, channel);

    let reply = relay.ask(&key, message).await?;
    println!("{}", reply);
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) {
    println!("{}", style("ollacord Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config file: {}", loader.config_path().display());
    let file_status = if loader.config_path().exists() {
        style("found").green()
    } else {
        style("not found, using defaults").yellow()
    };
    println!("  Status: {}", file_status);
    println!();

    println!("{}", style("Provider:").bold());
    println!("  Kind: {}", config.provider.kind);
    println!("  API base: {}", config.provider.api_base);
    println!("  Model: {}", config.provider.model);
    let key_status = if config.provider.api_key.is_empty() {
        style("not set").dim()
    } else {
        style("configured").green()
    };
    println!("  API key: {}", key_status);
    println!();

    println!("{}", style("Relay:").bold());
    println!("  History limit: {}", config.relay.history_limit);
    println!("  Chunk size: {}", config.relay.chunk_size);
    let timeout = if config.relay.inference_timeout_secs == 0 {
        "none".to_string()
    } else {
        format!("{}s", config.relay.inference_timeout_secs)
    };
    println!("  Inference timeout: {}", timeout);
    println!();

    println!("{}", style("Discord:").bold());
    let token_status = if config.require_discord_token().is_ok() {
        style("configured").green()
    } else {
        style("not configured").red()
    };
    println!("  Token: {}", token_status);
    println!("  Typing indicator: {}", config.discord.typing_indicator);
}
