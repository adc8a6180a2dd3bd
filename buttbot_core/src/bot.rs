// Channel orchestrator: the single entry point from the chat transport.
//
// `Bot::handle_line` takes one `ChatLine` at a time and runs it through:
//
// 1. Excluded senders are dropped before anything else happens.
// 2. Lines from the admin that parse as directives are handled here.
//    `<map`, `<unmap` and `<count` are consumed (no counter decrement, no
//    mutation); `<force` strips its prefix and forces the trigger.
// 3. The channel's settings are resolved: process config, then the config
//    file's channel overrides, then the store's (store wins).
// 4. The channel's `ChannelState` decides whether the line fires.
// 5. On a fire the line mutation engine runs, the result is sent, and only
//    after a successful send is the lock reset and the counter persisted.
//
// Every failure is logged and returned as `LineOutcome::Failed`; nothing
// propagates out of `handle_line`. Channel state lives in `self.channels`,
// so the decrement-decide-reset step for a channel is serialized by
// `&mut self`.

use std::collections::BTreeMap;

use buttbot_lang::{Hyphenator, StopWords, default_hyphenator, default_stop_words};
use buttbot_prng::RandomSource;
use tracing::{debug, info, warn};

use crate::config::{BotConfig, ChannelOverrides, MutationConfig, channel_key};
use crate::directive::Directive;
use crate::error::{BotError, MutationError, TransportError};
use crate::line::{LineMutator, MutationResult};
use crate::store::{BotStore, NoMappings};
use crate::trigger::{ChannelState, TriggerSettings};

/// One incoming chat message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatLine {
    pub sender: String,
    pub channel: String,
    pub text: String,
}

impl ChatLine {
    pub fn new(sender: impl Into<String>, channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            channel: channel.into(),
            text: text.into(),
        }
    }
}

/// The one capability the bot needs from the chat transport.
pub trait ChatTransport {
    fn send_line(&mut self, channel: &str, text: &str) -> Result<(), TransportError>;
}

/// What happened to a line.
#[derive(Debug)]
pub enum LineOutcome {
    /// Sender is excluded; nothing was counted.
    Ignored,
    /// An admin directive was handled; nothing was counted.
    Directive,
    /// Counted, but the trigger did not fire.
    Held { lock_counter: i64 },
    /// The line was mutated and the result sent.
    Mutated(MutationResult),
    /// Something went wrong; logged and swallowed.
    Failed(BotError),
}

pub struct Bot {
    config: BotConfig,
    store: Box<dyn BotStore>,
    hyphenator: Box<dyn Hyphenator + Send>,
    stop_words: StopWords,
    channels: BTreeMap<String, ChannelState>,
}

impl Bot {
    /// A bot with the embedded en-US hyphenation dictionary and stop-word
    /// list.
    pub fn new(config: BotConfig, store: Box<dyn BotStore>) -> Self {
        Self::with_language(config, store, Box::new(default_hyphenator()), default_stop_words())
    }

    pub fn with_language(
        config: BotConfig,
        store: Box<dyn BotStore>,
        hyphenator: Box<dyn Hyphenator + Send>,
        stop_words: StopWords,
    ) -> Self {
        Self {
            config,
            store,
            hyphenator,
            stop_words,
            channels: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn BotStore {
        &*self.store
    }

    /// Trigger state for `channel`, if a line from it has been seen.
    pub fn channel_state(&self, channel: &str) -> Option<&ChannelState> {
        self.channels.get(&channel_key(channel))
    }

    /// Process one chat line.
    pub fn handle_line(
        &mut self,
        line: ChatLine,
        transport: &mut dyn ChatTransport,
        rng: &mut dyn RandomSource,
    ) -> LineOutcome {
        if self.is_excluded(&line.sender) {
            debug!(sender = %line.sender, "ignoring excluded sender");
            return LineOutcome::Ignored;
        }

        let mut text = line.text.clone();
        let mut forced = false;
        if self.is_admin(&line.sender) {
            match Directive::parse(&text) {
                None => {}
                Some(Err(e)) => {
                    warn!(sender = %line.sender, error = %e, "malformed directive");
                    return LineOutcome::Failed(e.into());
                }
                Some(Ok(Directive::Force { text: body })) => {
                    forced = true;
                    text = body;
                }
                Some(Ok(directive)) => {
                    return match self.run_directive(directive, &line.channel, transport) {
                        Ok(()) => LineOutcome::Directive,
                        Err(e) => {
                            warn!(channel = %line.channel, error = %e, "directive failed");
                            LineOutcome::Failed(e)
                        }
                    };
                }
            }
        }

        let key = channel_key(&line.channel);
        let state = self.channels.entry(key).or_default();

        let store_overrides = match self.store.channel_overrides(&line.channel) {
            Ok(o) => o.unwrap_or_default(),
            Err(e) => {
                state.tick();
                warn!(channel = %line.channel, error = %e, "could not load channel settings");
                return LineOutcome::Failed(e.into());
            }
        };
        let overrides = self
            .config
            .overrides_for(&line.channel)
            .cloned()
            .unwrap_or_default()
            .layered(&store_overrides);
        let config = MutationConfig::resolve(&self.config, Some(&overrides));

        let sender_allowed =
            config.allow_self_trigger || !line.sender.eq_ignore_ascii_case(&self.config.username);
        let settings = TriggerSettings {
            base_chance: config.base_trigger_chance,
            lock_buffer: config.lock_buffer,
        };
        let roll = state.observe(settings, sender_allowed, forced, rng);
        debug!(
            channel = %line.channel,
            lock_counter = roll.lock_counter,
            chance = roll.effective_chance,
            roll = roll.roll,
            forced = roll.forced,
            fired = roll.fired,
            "trigger decision"
        );
        if !roll.fired {
            return LineOutcome::Held {
                lock_counter: roll.lock_counter,
            };
        }

        let engine = LineMutator::new(&config, &self.stop_words, &*self.hyphenator);
        let mutated = if config.mapping_lookup {
            engine.mutate(&text, &*self.store, rng)
        } else {
            engine.mutate(&text, &NoMappings, rng)
        };
        let result = match mutated {
            Ok(result) => result,
            Err(MutationError::Lookup(e)) => {
                warn!(channel = %line.channel, error = %e, "mapping lookup failed");
                return LineOutcome::Failed(BotError::CollaboratorUnavailable(e));
            }
            Err(e) => {
                debug!(channel = %line.channel, reason = %e, "mutation declined");
                return LineOutcome::Failed(e.into());
            }
        };

        if let Err(e) = transport.send_line(&line.channel, &result.text) {
            warn!(channel = %line.channel, error = %e, "failed to send mutated line");
            return LineOutcome::Failed(e.into());
        }
        state.record_fire(config.lock_buffer);
        info!(
            channel = %line.channel,
            words = result.changed_words.len(),
            text = %result.text,
            "line mutated"
        );
        if let Err(e) = self.store.increment_mutation_counter(&line.channel) {
            warn!(channel = %line.channel, error = %e, "failed to record mutation");
        }
        LineOutcome::Mutated(result)
    }

    /// Apply per-channel overrides to the store.
    pub fn set_channel_overrides(
        &mut self,
        channel: &str,
        overrides: ChannelOverrides,
    ) -> Result<(), BotError> {
        self.store.set_channel_overrides(channel, overrides)?;
        Ok(())
    }

    fn run_directive(
        &mut self,
        directive: Directive,
        channel: &str,
        transport: &mut dyn ChatTransport,
    ) -> Result<(), BotError> {
        match directive {
            Directive::Map { word, replacement } => {
                self.store.set_mapping(&word, &replacement)?;
                info!(word = %word, replacement = %replacement, "mapping set");
            }
            Directive::Unmap { word } => {
                let existed = self.store.remove_mapping(&word)?;
                info!(word = %word, existed, "mapping removed");
            }
            Directive::Count => {
                let count = self.store.mutation_count(channel)?;
                let reply = format!("{} has been {}ified {count} times", channel, self.config.meme);
                transport.send_line(channel, &reply)?;
            }
            // Handled inline by `handle_line`.
            Directive::Force { .. } => {}
        }
        Ok(())
    }

    fn is_admin(&self, sender: &str) -> bool {
        self.config
            .admin
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(sender))
    }

    fn is_excluded(&self, sender: &str) -> bool {
        self.config
            .excluded_senders
            .iter()
            .any(|s| s.eq_ignore_ascii_case(sender))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{MappingLookup, MemoryStore, WordMapping};
    use crate::testing::SyllableTable;
    use buttbot_prng::ScriptedSource;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<(String, String)>,
        fail: bool,
    }

    impl ChatTransport for RecordingTransport {
        fn send_line(&mut self, channel: &str, text: &str) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError("connection closed".into()));
            }
            self.sent.push((channel.to_string(), text.to_string()));
            Ok(())
        }
    }

    /// A store whose every call fails.
    struct DownStore;

    impl MappingLookup for DownStore {
        fn find_mapping(&self, _word: &str) -> Result<Option<WordMapping>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    impl BotStore for DownStore {
        fn set_mapping(&mut self, _: &str, _: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn remove_mapping(&mut self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn increment_mutation_counter(&mut self, _: &str) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn mutation_count(&self, _: &str) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn total_mutations(&self) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn channel_overrides(&self, _: &str) -> Result<Option<ChannelOverrides>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        fn set_channel_overrides(&mut self, _: &str, _: ChannelOverrides) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    /// Mappings cannot be read; everything else works.
    #[derive(Default)]
    struct LookupDownStore(MemoryStore);

    impl MappingLookup for LookupDownStore {
        fn find_mapping(&self, _word: &str) -> Result<Option<WordMapping>, StoreError> {
            Err(StoreError::Unavailable("mappings offline".into()))
        }
    }

    impl BotStore for LookupDownStore {
        fn set_mapping(&mut self, original: &str, mutated: &str) -> Result<(), StoreError> {
            self.0.set_mapping(original, mutated)
        }
        fn remove_mapping(&mut self, word: &str) -> Result<bool, StoreError> {
            self.0.remove_mapping(word)
        }
        fn increment_mutation_counter(&mut self, channel: &str) -> Result<u64, StoreError> {
            self.0.increment_mutation_counter(channel)
        }
        fn mutation_count(&self, channel: &str) -> Result<u64, StoreError> {
            self.0.mutation_count(channel)
        }
        fn total_mutations(&self) -> Result<u64, StoreError> {
            self.0.total_mutations()
        }
        fn channel_overrides(&self, channel: &str) -> Result<Option<ChannelOverrides>, StoreError> {
            self.0.channel_overrides(channel)
        }
        fn set_channel_overrides(
            &mut self,
            channel: &str,
            overrides: ChannelOverrides,
        ) -> Result<(), StoreError> {
            self.0.set_channel_overrides(channel, overrides)
        }
    }

    fn test_config() -> BotConfig {
        BotConfig {
            username: "buttbot".into(),
            admin: Some("Boss".into()),
            excluded_senders: vec!["nightbot".into()],
            lock_buffer: 0,
            trigger_chance: 1.0,
            ..BotConfig::default()
        }
    }

    fn with_store(config: BotConfig, store: Box<dyn BotStore>) -> Bot {
        Bot::with_language(config, store, Box::new(SyllableTable::default()), default_stop_words())
    }

    fn bot(config: BotConfig) -> Bot {
        with_store(config, Box::new(MemoryStore::new()))
    }

    #[test]
    fn fires_and_sends_mutated_line() {
        let mut bot = bot(test_config());
        let mut transport = RecordingTransport::default();
        let mut rng = ScriptedSource::constant(0.3);
        let outcome = bot.handle_line(
            ChatLine::new("viewer", "#chan", "the quick brown fox jumps"),
            &mut transport,
            &mut rng,
        );
        assert!(matches!(outcome, LineOutcome::Mutated(_)));
        assert_eq!(
            transport.sent,
            vec![("#chan".to_string(), "the quick butt fox jumps".to_string())]
        );
        assert_eq!(bot.store().mutation_count("#chan").unwrap(), 1);
        assert_eq!(bot.channel_state("#chan").unwrap().lock_counter(), 0);
    }

    #[test]
    fn short_line_still_decrements() {
        let config = BotConfig {
            lock_buffer: 5,
            ..test_config()
        };
        let mut bot = bot(config);
        let mut transport = RecordingTransport::default();
        let mut rng = ScriptedSource::constant(0.0);
        let outcome = bot.handle_line(ChatLine::new("viewer", "#chan", "hi"), &mut transport, &mut rng);
        assert!(matches!(
            outcome,
            LineOutcome::Failed(BotError::Mutation(MutationError::InsufficientLength { .. }))
        ));
        assert_eq!(bot.channel_state("#chan").unwrap().lock_counter(), -1);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn excluded_senders_are_not_counted() {
        let mut bot = bot(test_config());
        let mut transport = RecordingTransport::default();
        let mut rng = ScriptedSource::constant(0.0);
        let outcome = bot.handle_line(
            ChatLine::new("NightBot", "#chan", "the quick brown fox jumps"),
            &mut transport,
            &mut rng,
        );
        assert!(matches!(outcome, LineOutcome::Ignored));
        assert!(bot.channel_state("#chan").is_none());
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn own_lines_count_but_never_fire() {
        let mut bot = bot(test_config());
        let mut transport = RecordingTransport::default();
        let mut rng = ScriptedSource::constant(0.0);
        let outcome = bot.handle_line(
            ChatLine::new("ButtBot", "#chan", "the quick brown fox jumps"),
            &mut transport,
            &mut rng,
        );
        assert!(matches!(outcome, LineOutcome::Held { lock_counter: -1 }));
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn own_lines_fire_when_allowed() {
        let config = BotConfig {
            allow_self_trigger: true,
            ..test_config()
        };
        let mut bot = bot(config);
        let mut transport = RecordingTransport::default();
        let outcome = bot.handle_line(
            ChatLine::new("buttbot", "#chan", "the quick brown fox jumps"),
            &mut transport,
            &mut ScriptedSource::constant(0.3),
        );
        assert!(matches!(outcome, LineOutcome::Mutated(_)));
    }

    #[test]
    fn map_directive_is_consumed_and_used() {
        let config = BotConfig {
            lock_buffer: 3,
            trigger_chance: 0.0,
            ..test_config()
        };
        let mut bot = bot(config);
        let mut transport = RecordingTransport::default();
        let mut rng = ScriptedSource::constant(0.0);

        let outcome = bot.handle_line(ChatLine::new("boss", "#chan", "<map cat dog"), &mut transport, &mut rng);
        assert!(matches!(outcome, LineOutcome::Directive));
        assert!(bot.channel_state("#chan").is_none());
        let mapping = bot.store().find_mapping("cat").unwrap().unwrap();
        assert_eq!(mapping.mutated, "dog");

        let outcome = bot.handle_line(
            ChatLine::new("boss", "#chan", "<force the cat sat"),
            &mut transport,
            &mut rng,
        );
        let LineOutcome::Mutated(result) = outcome else {
            panic!("expected a mutation, got {outcome:?}");
        };
        assert_eq!(result.text, "the dog sat");
        // A forced fire resets the lock like any other.
        assert_eq!(bot.channel_state("#chan").unwrap().lock_counter(), 3);
    }

    #[test]
    fn directives_from_others_are_plain_text() {
        let config = BotConfig {
            trigger_chance: 0.0,
            lock_buffer: 10,
            ..test_config()
        };
        let mut bot = bot(config);
        let mut transport = RecordingTransport::default();
        let outcome = bot.handle_line(
            ChatLine::new("viewer", "#chan", "<map cat dog"),
            &mut transport,
            &mut ScriptedSource::constant(0.5),
        );
        assert!(matches!(outcome, LineOutcome::Held { .. }));
        assert!(bot.store().find_mapping("cat").unwrap().is_none());
    }

    #[test]
    fn malformed_directive_is_reported() {
        let mut bot = bot(test_config());
        let mut transport = RecordingTransport::default();
        let outcome = bot.handle_line(
            ChatLine::new("boss", "#chan", "<map cat"),
            &mut transport,
            &mut ScriptedSource::constant(0.0),
        );
        assert!(matches!(outcome, LineOutcome::Failed(BotError::MalformedDirective(_))));
        assert!(bot.channel_state("#chan").is_none());
    }

    #[test]
    fn unmap_and_count_directives() {
        let mut bot = bot(test_config());
        let mut transport = RecordingTransport::default();
        let mut rng = ScriptedSource::constant(0.3);
        bot.handle_line(ChatLine::new("boss", "#chan", "<map cat dog"), &mut transport, &mut rng);
        bot.handle_line(ChatLine::new("boss", "#chan", "<unmap cat"), &mut transport, &mut rng);
        assert!(bot.store().find_mapping("cat").unwrap().is_none());

        bot.handle_line(
            ChatLine::new("viewer", "#chan", "the quick brown fox jumps"),
            &mut transport,
            &mut rng,
        );
        transport.sent.clear();
        let outcome = bot.handle_line(ChatLine::new("boss", "#chan", "<count"), &mut transport, &mut rng);
        assert!(matches!(outcome, LineOutcome::Directive));
        assert_eq!(transport.sent.len(), 1);
        assert!(transport.sent[0].1.contains(" 1 times"), "{}", transport.sent[0].1);
    }

    #[test]
    fn send_failure_keeps_lock_and_count() {
        let config = BotConfig {
            lock_buffer: 7,
            ..test_config()
        };
        let mut bot = bot(config);
        let mut transport = RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        };
        let outcome = bot.handle_line(
            ChatLine::new("boss", "#chan", "<force the quick brown fox jumps"),
            &mut transport,
            &mut ScriptedSource::constant(0.3),
        );
        assert!(matches!(outcome, LineOutcome::Failed(BotError::Transport(_))));
        assert_eq!(bot.channel_state("#chan").unwrap().lock_counter(), 0);
        assert_eq!(bot.store().mutation_count("#chan").unwrap(), 0);
    }

    #[test]
    fn unavailable_store_fails_the_line_but_counts_it() {
        let mut bot = with_store(test_config(), Box::new(DownStore));
        let mut transport = RecordingTransport::default();
        let outcome = bot.handle_line(
            ChatLine::new("viewer", "#chan", "the quick brown fox jumps"),
            &mut transport,
            &mut ScriptedSource::constant(0.3),
        );
        assert!(matches!(outcome, LineOutcome::Failed(BotError::CollaboratorUnavailable(_))));
        assert_eq!(bot.channel_state("#chan").unwrap().lock_counter(), -1);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn failed_mapping_lookup_is_a_collaborator_failure() {
        let mut bot = with_store(test_config(), Box::new(LookupDownStore::default()));
        let mut transport = RecordingTransport::default();
        let outcome = bot.handle_line(
            ChatLine::new("viewer", "#chan", "the quick brown fox jumps"),
            &mut transport,
            &mut ScriptedSource::constant(0.3),
        );
        assert!(
            matches!(outcome, LineOutcome::Failed(BotError::CollaboratorUnavailable(_))),
            "{outcome:?}"
        );
        assert_eq!(bot.channel_state("#chan").unwrap().lock_counter(), -1);
        assert_eq!(bot.store().mutation_count("#chan").unwrap(), 0);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn store_overrides_beat_config_overrides() {
        let mut config = test_config();
        config.channel_overrides.insert(
            "chan".into(),
            ChannelOverrides {
                lock_buffer: Some(4),
                ..ChannelOverrides::default()
            },
        );
        let mut bot = bot(config);
        bot.set_channel_overrides(
            "#chan",
            ChannelOverrides {
                lock_buffer: Some(9),
                ..ChannelOverrides::default()
            },
        )
        .unwrap();
        let mut transport = RecordingTransport::default();
        bot.handle_line(
            ChatLine::new("viewer", "#Chan", "the quick brown fox jumps"),
            &mut transport,
            &mut ScriptedSource::constant(0.3),
        );
        assert_eq!(bot.channel_state("#chan").unwrap().lock_counter(), 9);
    }

    #[test]
    fn disabled_mapping_lookup_ignores_mappings() {
        let config = BotConfig {
            mapping_lookup: false,
            ..test_config()
        };
        let mut bot = bot(config);
        let mut transport = RecordingTransport::default();
        let mut rng = ScriptedSource::constant(0.0);
        bot.handle_line(ChatLine::new("boss", "#chan", "<map cat dog"), &mut transport, &mut rng);
        let outcome = bot.handle_line(
            ChatLine::new("viewer", "#chan", "the cat sat"),
            &mut transport,
            &mut rng,
        );
        let LineOutcome::Mutated(result) = outcome else {
            panic!("expected a mutation, got {outcome:?}");
        };
        assert_eq!(result.text, "the butt sat");
    }

    #[test]
    fn channels_are_independent() {
        let config = BotConfig {
            trigger_chance: 0.0,
            lock_buffer: 10,
            ..test_config()
        };
        let mut bot = bot(config);
        let mut transport = RecordingTransport::default();
        let mut rng = ScriptedSource::constant(0.5);
        for _ in 0..3 {
            bot.handle_line(ChatLine::new("v", "#one", "hello there friend"), &mut transport, &mut rng);
        }
        bot.handle_line(ChatLine::new("v", "#two", "hello there friend"), &mut transport, &mut rng);
        assert_eq!(bot.channel_state("#one").unwrap().lock_counter(), -3);
        assert_eq!(bot.channel_state("#two").unwrap().lock_counter(), -1);
    }
}
