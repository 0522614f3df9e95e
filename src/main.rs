use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use squad_stats::aggregate::StatsAggregator;
use squad_stats::config::AppConfig;
use squad_stats::digest::DigestScheduler;
use squad_stats::gateway::{
    ChatRequest, CommandGateway, CommandGrammar, GatewayConfig, GatewayError, GatewayReply,
    IngameRequest,
};
use squad_stats::models::{ChatUserId, PlayerId, RoleId};
use squad_stats::parse_clock_time;
use squad_stats::present::{daily_embed, ingame_text, personal_embed, MessageEmbed, MessageSink, SinkError};
use squad_stats::resolver::{WhitelisterClient, WhitelisterConfig};
use squad_stats::store::{load_export, MemoryStore};

#[derive(Parser)]
#[command(name = "squad-stats")]
#[command(about = "Player combat statistics service for Squad game servers")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Event store export directory (overrides config)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Personal stats via the in-game command path
    Stats {
        /// 17-digit player id
        #[arg(long)]
        player: String,

        /// Window override in days
        #[arg(long)]
        days: Option<u32>,

        /// Simulate a requester without the reserve permission
        #[arg(long)]
        no_reserve: bool,
    },

    /// Run a raw external-chat message through the command gateway
    Chat {
        /// Chat-platform user id of the requester
        #[arg(long)]
        user: String,

        /// Role held by the requester (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        /// Raw message text, e.g. "!mystats 76561198012345678"
        message: String,
    },

    /// Render the daily digest once
    Daily {
        /// Window override in days
        #[arg(long)]
        days: Option<u32>,
    },

    /// Run the daily digest scheduler until interrupted
    Serve,
}

/// Posts rendered embeds to stdout as JSON.
struct StdoutSink;

#[async_trait::async_trait]
impl MessageSink for StdoutSink {
    async fn post(&self, message: &MessageEmbed) -> Result<(), SinkError> {
        let json = serde_json::to_string_pretty(message)
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        println!("{}", json);
        Ok(())
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = PathBuf::from(&cli.config);
    let mut config = if path.exists() {
        AppConfig::from_file(&path).with_context(|| format!("loading {:?}", path))?
    } else {
        tracing::info!("No config file at {:?}, using defaults", path);
        AppConfig::default()
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }
    Ok(config)
}

fn build_gateway(
    config: &AppConfig,
    store: Arc<MemoryStore>,
    window_days: u32,
) -> Result<CommandGateway<MemoryStore, WhitelisterClient>> {
    let resolver = WhitelisterClient::new(WhitelisterConfig {
        base_url: url::Url::parse(&config.resolver.base_url).context("resolver base URL")?,
        username: config.resolver.username.clone(),
        password: config.resolver.password.clone(),
        timeout: Duration::from_secs(config.resolver.timeout_seconds),
    })
    .context("building whitelister client")?;

    let gateway_config = GatewayConfig {
        window_days,
        ingame_enabled: config.stats.ingame_enabled,
        chat_stats_enabled: config.stats.chat_enabled,
        digest_enabled: config.digest.enabled,
        require_reserve: config.stats.require_reserve,
        digest_role: config.digest.manual_role.clone().map(RoleId::new),
    };

    Ok(CommandGateway::new(
        StatsAggregator::new(store),
        Arc::new(resolver),
        gateway_config,
        config.stats.cooldown_minutes,
    ))
}

fn print_reply(config: &AppConfig, reply: GatewayReply) -> Result<()> {
    let embed = match reply {
        GatewayReply::Personal(snapshot) => personal_embed(&snapshot, config.stats.embed_color),
        GatewayReply::Digest(snapshot) => daily_embed(&snapshot, config.digest.embed_color),
    };
    println!("{}", serde_json::to_string_pretty(&embed)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting squad-stats v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let store = Arc::new(load_export(&config.data_dir).context("loading event store export")?);

    match cli.command {
        Commands::Stats {
            player,
            days,
            no_reserve,
        } => {
            let player = PlayerId::parse(&player).context("invalid --player id")?;
            let window_days = days.unwrap_or(config.stats.window_days);
            let gateway = build_gateway(&config, store, window_days)?;

            match gateway
                .handle_ingame(IngameRequest {
                    player,
                    has_reserve: !no_reserve,
                })
                .await
            {
                Ok(snapshot) => println!("{}", ingame_text(&snapshot)),
                Err(e) => println!("{}", e.user_message()),
            }
        }

        Commands::Chat {
            user,
            roles,
            message,
        } => {
            let grammar = CommandGrammar::new(&config.stats.chat_command, &config.digest.command)
                .context("building command grammar")?;
            let Some(command) = grammar.parse(&message) else {
                println!("Not a recognized command: {}", message);
                return Ok(());
            };

            let gateway = build_gateway(&config, store, config.stats.window_days)?;
            let request = ChatRequest {
                user: ChatUserId::new(user),
                roles: roles.into_iter().map(RoleId::new).collect(),
                command,
            };

            match gateway.handle_chat(request).await {
                Ok(reply) => print_reply(&config, reply)?,
                Err(e) => {
                    if let GatewayError::Upstream(detail) = &e {
                        tracing::error!("Chat command failed upstream: {}", detail);
                    }
                    println!("{}", e.user_message());
                }
            }
        }

        Commands::Daily { days } => {
            let window_days = days.unwrap_or(config.stats.window_days);
            let post_time = parse_clock_time(&config.digest.post_time)
                .context("digest post_time is not HH:MM")?;

            let mut scheduler = DigestScheduler::new(
                StatsAggregator::new(store),
                Arc::new(StdoutSink),
                post_time,
                window_days,
                config.digest.embed_color,
            );
            scheduler.fire().await;
        }

        Commands::Serve => {
            if !config.digest.enabled {
                tracing::warn!("Daily digest is disabled in the config, nothing to serve");
                return Ok(());
            }

            let post_time = parse_clock_time(&config.digest.post_time)
                .context("digest post_time is not HH:MM")?;

            let mut scheduler = DigestScheduler::new(
                StatsAggregator::new(store),
                Arc::new(StdoutSink),
                post_time,
                config.stats.window_days,
                config.digest.embed_color,
            );

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

            tokio::signal::ctrl_c().await?;
            tracing::info!("Interrupt received, shutting down");
            shutdown_tx.send(true)?;
            handle.await?;
        }
    }

    Ok(())
}
