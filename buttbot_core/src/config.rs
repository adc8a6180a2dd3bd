// Bot configuration and per-channel settings resolution.
//
// `BotConfig` is the process-wide configuration, loaded from an optional JSON
// file and then patched by command-line flags in the binary. Every field has
// a default, so `{}` is a valid config file. Defaults match the long-standing
// environment-variable defaults of the bot (`butt`, 3 words, factor 3,
// threshold -10, buffer 10).
//
// `MutationConfig` is what the engine and trigger controller actually read:
// the process config with a channel's `ChannelOverrides` applied. Resolution
// is an explicit merge over exactly three fields (trigger chance, lock
// buffer, mapping lookup). Nothing else can be overridden per channel, and
// an override that breaks an invariant (chance outside [0, 1], negative
// buffer) is ignored in favor of the process value.
//
// See also: `store.rs`, which can hold per-channel overrides that take
// precedence over the ones in the config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating a `BotConfig`.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Process-wide bot configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Chat login of the bot. Lines from this sender are never mutated
    /// unless `allow_self_trigger` is set.
    pub username: String,
    /// Chat password (an `oauth:` token on Twitch).
    pub password: Option<String>,
    /// `host:port` of the chat server.
    pub server: String,
    /// Channels to join on connect.
    pub channels: Vec<String>,
    /// Token substituted for mutated syllables and words.
    pub meme: String,
    /// Lines with fewer space-separated tokens are never mutated.
    pub min_words_before_mutation: usize,
    /// A line of `n` tokens gets at most `floor(n / factor)` mutation
    /// attempts (and always at least one).
    pub max_candidates_factor: usize,
    /// Mappings scored at or below this are suppressed entirely.
    pub negative_threshold: i64,
    /// Base probability of a line triggering, in [0, 1].
    pub trigger_chance: f64,
    /// Lines refused after a trigger before the next one may fire.
    pub lock_buffer: i64,
    /// Consult the mapping store before mutating a word.
    pub mapping_lookup: bool,
    /// Let the bot react to its own lines.
    pub allow_self_trigger: bool,
    /// Privileged sender allowed to issue `<map`, `<unmap`, `<force` and
    /// `<count` directives.
    pub admin: Option<String>,
    /// Senders whose lines are ignored outright (other bots, usually).
    pub excluded_senders: Vec<String>,
    /// JSON store file; `None` keeps mappings and counters in memory.
    pub store_path: Option<PathBuf>,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
    /// Per-channel overrides, keyed by channel name without the `#`.
    pub channel_overrides: BTreeMap<String, ChannelOverrides>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: "buttbot".into(),
            password: None,
            server: "irc.chat.twitch.tv:6667".into(),
            channels: Vec::new(),
            meme: "butt".into(),
            min_words_before_mutation: 3,
            max_candidates_factor: 3,
            negative_threshold: -10,
            trigger_chance: 0.0,
            lock_buffer: 10,
            mapping_lookup: true,
            allow_self_trigger: false,
            admin: None,
            excluded_senders: Vec::new(),
            store_path: None,
            seed: None,
            channel_overrides: BTreeMap::new(),
        }
    }
}

impl BotConfig {
    /// Parse a config from a JSON string. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Check the invariants the trigger controller and engine rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.trigger_chance) {
            return Err(ConfigError::Invalid(format!(
                "trigger_chance must be within [0, 1], got {}",
                self.trigger_chance
            )));
        }
        if self.lock_buffer < 0 {
            return Err(ConfigError::Invalid(format!(
                "lock_buffer must be non-negative, got {}",
                self.lock_buffer
            )));
        }
        if self.max_candidates_factor == 0 {
            return Err(ConfigError::Invalid(
                "max_candidates_factor must be at least 1".into(),
            ));
        }
        if self.meme.trim().is_empty() || self.meme.contains(' ') {
            return Err(ConfigError::Invalid(
                "meme must be a single non-empty word".into(),
            ));
        }
        for (channel, overrides) in &self.channel_overrides {
            overrides
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("channel {channel}: {e}")))?;
        }
        Ok(())
    }

    /// Overrides from the config file for `channel`, if any.
    pub fn overrides_for(&self, channel: &str) -> Option<&ChannelOverrides> {
        self.channel_overrides.get(&channel_key(channel))
    }
}

/// The per-channel subset of settings that may differ from the process
/// config.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelOverrides {
    pub trigger_chance: Option<f64>,
    pub lock_buffer: Option<i64>,
    pub mapping_lookup: Option<bool>,
}

impl ChannelOverrides {
    /// Field-by-field layering: values set in `top` win over `self`.
    pub fn layered(&self, top: &ChannelOverrides) -> ChannelOverrides {
        ChannelOverrides {
            trigger_chance: top.trigger_chance.or(self.trigger_chance),
            lock_buffer: top.lock_buffer.or(self.lock_buffer),
            mapping_lookup: top.mapping_lookup.or(self.mapping_lookup),
        }
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(chance) = self.trigger_chance {
            if !(0.0..=1.0).contains(&chance) {
                return Err(format!("trigger_chance {chance} outside [0, 1]"));
            }
        }
        if let Some(buffer) = self.lock_buffer {
            if buffer < 0 {
                return Err(format!("lock_buffer {buffer} is negative"));
            }
        }
        Ok(())
    }
}

/// Fully resolved settings for one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationConfig {
    pub meme: String,
    pub min_words_before_mutation: usize,
    pub max_candidates_factor: usize,
    pub negative_threshold: i64,
    pub base_trigger_chance: f64,
    pub lock_buffer: i64,
    pub mapping_lookup: bool,
    pub allow_self_trigger: bool,
}

impl MutationConfig {
    /// Apply a channel's overrides to the process config.
    pub fn resolve(base: &BotConfig, overrides: Option<&ChannelOverrides>) -> Self {
        let empty = ChannelOverrides::default();
        let o = overrides.unwrap_or(&empty);
        MutationConfig {
            meme: base.meme.clone(),
            min_words_before_mutation: base.min_words_before_mutation,
            max_candidates_factor: base.max_candidates_factor.max(1),
            negative_threshold: base.negative_threshold,
            base_trigger_chance: o
                .trigger_chance
                .filter(|c| (0.0..=1.0).contains(c))
                .unwrap_or(base.trigger_chance),
            lock_buffer: o
                .lock_buffer
                .filter(|b| *b >= 0)
                .unwrap_or(base.lock_buffer),
            mapping_lookup: o.mapping_lookup.unwrap_or(base.mapping_lookup),
            allow_self_trigger: base.allow_self_trigger,
        }
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self::resolve(&BotConfig::default(), None)
    }
}

/// Canonical channel key: lowercase, without a leading `#`.
pub fn channel_key(channel: &str) -> String {
    channel.trim_start_matches('#').to_ascii_lowercase()
}
