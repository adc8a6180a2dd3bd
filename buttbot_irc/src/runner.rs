// Bot run loop: connects, feeds chat lines to the `Bot`, reconnects.
//
// Architecture: one bot thread owns the `Bot`, its RNG and the current
// `IrcClient`. Incoming messages arrive through the client's `mpsc` inbox;
// the loop waits on it with `recv_timeout` so it can notice the stop flag
// between messages. Because a single thread processes every line, each
// channel's trigger decision completes before the next line is looked at.
//
// Connection loss ends the current client, and the thread reconnects after
// a backoff (doubling up to `MAX_RECONNECT_DELAY`). The `Bot`, and with it
// every channel's lock counter, survives reconnects. A rejected login ends
// the thread with an error.
//
// Shutdown: `BotHandle::stop` clears the `keep_running` flag and joins the
// thread, which sends QUIT before exiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use buttbot_core::{Bot, BotConfig, BotStore, ChatLine, JsonFileStore, MemoryStore, StoreError};
use buttbot_prng::RandomSource;
use tracing::{debug, info, warn};

use crate::client::{Credentials, IrcClient};
use crate::error::IrcError;
use crate::message::IrcMessage;

/// How often the loop checks the stop flag while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

/// Where and how to connect.
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    pub server: String,
    pub credentials: Credentials,
    pub channels: Vec<String>,
    pub reconnect_delay: Duration,
}

impl ConnectOptions {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            server: config.server.clone(),
            credentials: Credentials {
                nick: config.username.clone(),
                password: config.password.clone(),
            },
            channels: config.channels.clone(),
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

/// Handle returned by `start_bot` to control the running bot.
pub struct BotHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<(), IrcError>>>,
}

impl BotHandle {
    /// Signal the bot to stop and wait for it to shut down.
    pub fn stop(self) -> Result<(), IrcError> {
        self.keep_running.store(false, Ordering::SeqCst);
        self.wait()
    }

    /// Wait for the bot thread to exit on its own.
    pub fn wait(mut self) -> Result<(), IrcError> {
        match self.thread.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(IrcError::Protocol("bot thread panicked".into()))),
            None => Ok(()),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }
}

/// Open the store named by the config, or an in-memory one.
pub fn open_store(config: &BotConfig) -> Result<Box<dyn BotStore>, StoreError> {
    match &config.store_path {
        Some(path) => Ok(Box::new(JsonFileStore::open(path)?)),
        None => Ok(Box::new(MemoryStore::new())),
    }
}

/// Start the bot on a background thread.
pub fn start_bot<R>(options: ConnectOptions, bot: Bot, rng: R) -> BotHandle
where
    R: RandomSource + Send + 'static,
{
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || run_session(options, bot, rng, &keep_running_clone));

    BotHandle {
        keep_running,
        thread: Some(thread),
    }
}

/// Connect, run, and reconnect until stopped or rejected.
fn run_session<R: RandomSource>(
    options: ConnectOptions,
    mut bot: Bot,
    mut rng: R,
    keep_running: &AtomicBool,
) -> Result<(), IrcError> {
    let mut delay = options.reconnect_delay;
    while keep_running.load(Ordering::SeqCst) {
        match IrcClient::connect(&options.server, &options.credentials, &options.channels) {
            Ok(mut client) => {
                delay = options.reconnect_delay;
                let result = run_bot(&mut client, &mut bot, &mut rng, keep_running);
                client.disconnect();
                match result {
                    Ok(()) => return Ok(()),
                    Err(e) => warn!(error = %e, "connection lost"),
                }
            }
            Err(IrcError::Rejected(reason)) => return Err(IrcError::Rejected(reason)),
            Err(e) => warn!(server = %options.server, error = %e, "connect failed"),
        }
        info!(delay_secs = delay.as_secs_f64(), "reconnecting");
        sleep_while_running(delay, keep_running);
        delay = (delay * 2).min(MAX_RECONNECT_DELAY);
    }
    Ok(())
}

/// Process messages from one connection until stopped (`Ok`) or the
/// connection fails (`Err`).
pub fn run_bot(
    client: &mut IrcClient,
    bot: &mut Bot,
    rng: &mut dyn RandomSource,
    keep_running: &AtomicBool,
) -> Result<(), IrcError> {
    while keep_running.load(Ordering::SeqCst) {
        if let Some(msg) = client.recv_timeout(POLL_INTERVAL)? {
            dispatch(client, bot, rng, &msg)?;
        }
    }
    Ok(())
}

fn dispatch(
    client: &mut IrcClient,
    bot: &mut Bot,
    rng: &mut dyn RandomSource,
    msg: &IrcMessage,
) -> Result<(), IrcError> {
    if let Some(token) = msg.ping_token() {
        return client.pong(token);
    }
    if let Some(privmsg) = msg.as_privmsg() {
        let line = ChatLine::new(privmsg.sender, privmsg.channel, privmsg.text);
        let outcome = bot.handle_line(line, client, rng);
        debug!(channel = %privmsg.channel, outcome = ?outcome, "line handled");
        return Ok(());
    }
    if msg.command == "RECONNECT" {
        return Err(IrcError::Protocol("server requested reconnect".into()));
    }
    Ok(())
}

fn sleep_while_running(total: Duration, keep_running: &AtomicBool) {
    let deadline = Instant::now() + total;
    while keep_running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}
