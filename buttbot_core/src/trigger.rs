// Per-channel trigger controller.
//
// Each channel owns a signed lock counter. Every observed line decrements
// it; a successful mutation resets it to the lock buffer. A line can only
// fire once the counter is at or below zero, and then only if the roll lands
// under the effective chance.
//
// Escalation: once more lines have passed since the last fire than the base
// chance "expects" (`100 * base`), the effective chance is replaced by
// `(since_last_fire - lock_buffer) / 100`, which grows by one percentage
// point per line. Note this is the raw replacement, not `max(base, ...)`, so
// for a large base chance it can briefly sit below the base.
//
// The counter is private. `observe` and `record_fire` are the only writers,
// and both take `&mut self`, so a channel's decrement-decide-reset sequence
// is serialized by whoever owns the state (the `Bot`).

use buttbot_prng::RandomSource;

/// Settings the controller reads for one decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerSettings {
    pub base_chance: f64,
    pub lock_buffer: i64,
}

/// Everything that went into one decision, for logging and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerRoll {
    pub fired: bool,
    pub forced: bool,
    /// Counter after this line's decrement (and force reset, if any).
    pub lock_counter: i64,
    pub effective_chance: f64,
    pub roll: f64,
}

/// Adaptive trigger state for one channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelState {
    lock_counter: i64,
}

impl ChannelState {
    /// A channel whose counter starts at `lock_counter` instead of zero.
    pub fn with_lock_counter(lock_counter: i64) -> Self {
        Self { lock_counter }
    }

    pub fn lock_counter(&self) -> i64 {
        self.lock_counter
    }

    /// Count a line without deciding anything. Used for lines that fail
    /// before a decision can be made.
    pub fn tick(&mut self) {
        self.lock_counter -= 1;
    }

    /// Count one line and decide whether it fires.
    ///
    /// `sender_allowed` is false for the bot's own lines (unless self
    /// triggering is enabled); such lines still decrement the counter.
    /// `forced` zeroes the counter and sets the chance to 1 before the
    /// decision. Exactly one value is drawn from `rng`.
    pub fn observe(
        &mut self,
        settings: TriggerSettings,
        sender_allowed: bool,
        forced: bool,
        rng: &mut dyn RandomSource,
    ) -> TriggerRoll {
        self.tick();
        let mut chance = effective_chance(settings, self.lock_counter);
        let roll = rng.next_f64();
        if forced {
            chance = 1.0;
            self.lock_counter = 0;
        }
        TriggerRoll {
            fired: sender_allowed && self.lock_counter <= 0 && roll <= chance,
            forced,
            lock_counter: self.lock_counter,
            effective_chance: chance,
            roll,
        }
    }

    /// Restart the lock after a mutation was actually emitted.
    pub fn record_fire(&mut self, lock_buffer: i64) {
        self.lock_counter = lock_buffer;
    }
}

/// The chance used for a decision at the given (already decremented)
/// counter.
pub fn effective_chance(settings: TriggerSettings, lock_counter: i64) -> f64 {
    let intended = 100.0 * settings.base_chance;
    let since_last_fire = settings.lock_buffer - lock_counter;
    if since_last_fire as f64 > intended {
        (since_last_fire - settings.lock_buffer) as f64 / 100.0
    } else {
        settings.base_chance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buttbot_prng::ScriptedSource;

    const BUFFER_10: TriggerSettings = TriggerSettings {
        base_chance: 0.0,
        lock_buffer: 10,
    };

    #[test]
    fn lock_buffer_holds_then_fires() {
        let mut state = ChannelState::with_lock_counter(10);
        let mut rng = ScriptedSource::constant(0.0);
        for line in 1..=9 {
            let roll = state.observe(BUFFER_10, true, false, &mut rng);
            assert!(!roll.fired, "line {line} fired early");
            assert_eq!(roll.lock_counter, 10 - line);
        }
        let roll = state.observe(BUFFER_10, true, false, &mut rng);
        assert_eq!(roll.lock_counter, 0);
        assert!(roll.fired);
        state.record_fire(BUFFER_10.lock_buffer);
        assert_eq!(state.lock_counter(), 10);
    }

    #[test]
    fn counter_stays_decremented_without_record_fire() {
        let mut state = ChannelState::with_lock_counter(1);
        let mut rng = ScriptedSource::constant(0.0);
        assert!(state.observe(BUFFER_10, true, false, &mut rng).fired);
        // The caller's mutation failed, so nothing resets the counter.
        assert!(state.observe(BUFFER_10, true, false, &mut rng).fired);
        assert_eq!(state.lock_counter(), -1);
    }

    #[test]
    fn default_state_starts_unlocked() {
        let mut state = ChannelState::default();
        let settings = TriggerSettings {
            base_chance: 1.0,
            lock_buffer: 10,
        };
        let roll = state.observe(settings, true, false, &mut ScriptedSource::constant(0.99));
        assert!(roll.fired);
        assert_eq!(roll.lock_counter, -1);
    }

    #[test]
    fn roll_above_chance_does_not_fire() {
        let mut state = ChannelState::default();
        let settings = TriggerSettings {
            base_chance: 0.5,
            lock_buffer: 0,
        };
        let roll = state.observe(settings, true, false, &mut ScriptedSource::constant(0.75));
        assert!(!roll.fired);
        let roll = state.observe(settings, true, false, &mut ScriptedSource::constant(0.25));
        assert!(roll.fired);
    }

    #[test]
    fn disallowed_sender_decrements_but_never_fires() {
        let mut state = ChannelState::default();
        let roll = state.observe(BUFFER_10, false, true, &mut ScriptedSource::constant(0.0));
        assert!(!roll.fired);
        assert_eq!(state.lock_counter(), 0);
        state.observe(BUFFER_10, false, false, &mut ScriptedSource::constant(0.0));
        assert_eq!(state.lock_counter(), -1);
    }

    #[test]
    fn force_bypasses_lock_and_chance() {
        let mut state = ChannelState::with_lock_counter(10);
        let roll = state.observe(BUFFER_10, true, true, &mut ScriptedSource::constant(0.99));
        assert!(roll.fired);
        assert!(roll.forced);
        assert_eq!(roll.effective_chance, 1.0);
        assert_eq!(roll.lock_counter, 0);
    }

    #[test]
    fn observe_draws_exactly_once() {
        let mut state = ChannelState::default();
        let mut rng = ScriptedSource::constant(0.5);
        state.observe(BUFFER_10, true, false, &mut rng);
        state.observe(BUFFER_10, true, true, &mut rng);
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn base_chance_applies_within_expected_interval() {
        let settings = TriggerSettings {
            base_chance: 0.2,
            lock_buffer: 10,
        };
        // 15 lines since the last fire, 20 expected.
        assert_eq!(effective_chance(settings, -5), 0.2);
    }

    #[test]
    fn escalation_strictly_increases_past_expected_interval() {
        let settings = TriggerSettings {
            base_chance: 0.05,
            lock_buffer: 10,
        };
        let mut state = ChannelState::with_lock_counter(10);
        // Never fire: the roll sits just under 1.
        let mut rng = ScriptedSource::constant(0.999);
        let mut previous: Option<f64> = None;
        for _ in 0..60 {
            let roll = state.observe(settings, true, false, &mut rng);
            let since = settings.lock_buffer - roll.lock_counter;
            if since as f64 > settings.lock_buffer as f64 + 100.0 * settings.base_chance {
                if let Some(prev) = previous {
                    assert!(roll.effective_chance > prev);
                }
                previous = Some(roll.effective_chance);
            }
        }
        assert!(previous.is_some());
    }

    #[test]
    fn escalated_chance_is_one_percent_per_line_below_zero() {
        let settings = TriggerSettings {
            base_chance: 0.0,
            lock_buffer: 10,
        };
        assert_eq!(effective_chance(settings, -25), 0.25);
    }
}
