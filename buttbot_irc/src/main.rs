// CLI entry point for buttbot.
//
// Loads the optional JSON config file, applies command-line flags (each of
// which also reads an environment variable) on top of it, validates the
// result, and runs the bot until the server rejects the login or the process
// is killed. See `runner.rs` for the run loop and `buttbot_core::bot` for
// what happens to each line.
//
// Usage:
//   buttbot [OPTIONS]
//     --config <PATH>         JSON config file                    [BOT_CONFIG]
//     --username <NAME>       Chat login                          [BOT_USERNAME]
//     --password <TOKEN>      Chat password / oauth token         [BOT_PASSWORD]
//     --channel <NAME>...     Channels to join (comma-separated)  [TWITCH_CHANNEL]
//     --server <HOST:PORT>    Chat server                         [BOT_SERVER]
//     --meme <WORD>           Meme token                          [BOT_MEME]
//     --chance <P>            Base trigger chance in [0, 1]       [BOT_CHANCE]
//     --lock-buffer <N>       Lines locked out after a trigger    [BOT_BUTT_BUFFER]
//     --admin <NAME>          Sender allowed to issue directives  [BOT_ADMIN]
//     --store <PATH>          JSON store file                     [BOT_STORE]
//     --seed <N>              Fixed RNG seed
//     --log-level <FILTER>    Fallback when RUST_LOG is unset     [BOT_LOG_LEVEL]
//     --log-json              JSON log output

use std::path::PathBuf;
use std::process::ExitCode;

use buttbot_core::{Bot, BotConfig, ConfigError};
use buttbot_irc::runner::open_store;
use buttbot_irc::{ConnectOptions, start_bot};
use buttbot_prng::BotRng;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "buttbot")]
#[command(about = "Chat bot that replaces words with a meme token", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file
    #[arg(short, long, env = "BOT_CONFIG")]
    config: Option<PathBuf>,

    /// Chat login of the bot
    #[arg(short, long, env = "BOT_USERNAME")]
    username: Option<String>,

    /// Chat password (oauth token on Twitch)
    #[arg(long, env = "BOT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Channels to join
    #[arg(long = "channel", env = "TWITCH_CHANNEL", value_delimiter = ',')]
    channels: Vec<String>,

    /// Chat server address
    #[arg(long, env = "BOT_SERVER")]
    server: Option<String>,

    /// Meme token substituted into lines
    #[arg(long, env = "BOT_MEME")]
    meme: Option<String>,

    /// Base trigger chance
    #[arg(long, env = "BOT_CHANCE")]
    chance: Option<f64>,

    /// Lines refused after each trigger
    #[arg(long, env = "BOT_BUTT_BUFFER")]
    lock_buffer: Option<i64>,

    /// Sender allowed to issue directives
    #[arg(long, env = "BOT_ADMIN")]
    admin: Option<String>,

    /// JSON store file for mappings and counters
    #[arg(long, env = "BOT_STORE")]
    store: Option<PathBuf>,

    /// Fixed RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log level
    #[arg(long, env = "BOT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    log_json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "failed to open store");
            return ExitCode::FAILURE;
        }
    };

    let rng = config.seed.map_or_else(BotRng::from_clock, BotRng::new);
    let options = ConnectOptions::from_config(&config);
    info!(
        server = %options.server,
        nick = %options.credentials.nick,
        channels = ?options.channels,
        "starting"
    );
    let handle = start_bot(options, Bot::new(config, store), rng);

    match handle.wait() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "bot stopped");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Config file (if any), then command-line flags on top.
fn load_config(cli: Cli) -> Result<BotConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => BotConfig::load(path)?,
        None => BotConfig::default(),
    };

    if let Some(username) = cli.username {
        config.username = username;
    }
    if cli.password.is_some() {
        config.password = cli.password;
    }
    if !cli.channels.is_empty() {
        config.channels = cli.channels;
    }
    if let Some(server) = cli.server {
        config.server = server;
    }
    if let Some(meme) = cli.meme {
        config.meme = meme;
    }
    if let Some(chance) = cli.chance {
        config.trigger_chance = chance;
    }
    if let Some(buffer) = cli.lock_buffer {
        config.lock_buffer = buffer;
    }
    if cli.admin.is_some() {
        config.admin = cli.admin;
    }
    if cli.store.is_some() {
        config.store_path = cli.store;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    config.validate()?;
    if config.channels.is_empty() {
        return Err(ConfigError::Invalid(
            "no channels to join (set --channel or TWITCH_CHANNEL)".into(),
        ));
    }
    Ok(config)
}
