// Deterministic, portable pseudo-random number generator and the random
// source seam used by the mutation engine and trigger controller.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// This is a hand-rolled implementation with zero external RNG dependencies,
// so that a seeded bot replays the same decisions on every platform.
//
// Every random decision in `buttbot_core` (which words to mutate, which
// syllable to swap, whether a line triggers) goes through the `RandomSource`
// trait rather than a concrete generator. Production code passes a `BotRng`;
// tests pass a `ScriptedSource` that replays a fixed list of draws, which
// makes the algorithms fully deterministic without knowing the generator's
// internals.
//
// **Critical constraint: determinism.** `BotRng` must produce identical
// output given the same prior state, regardless of platform, compiler
// version, or optimization level. Do not use floating-point arithmetic in the
// core generator.

use serde::{Deserialize, Serialize};

/// A source of uniform draws in [0, 1).
///
/// The mutation algorithms only ever need "a number in [0, 1)" and "an index
/// below `len`", mirroring how the bot's behavior is described in terms of
/// `floor(random() * n)`.
pub trait RandomSource {
    /// Next uniform value in [0, 1).
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `[0, len)`, computed as `floor(next_f64() * len)`.
    ///
    /// Panics if `len == 0`.
    fn pick_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "pick_index: len must be positive");
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len - 1)
    }
}

/// Xoshiro256++ PRNG, the bot's default source of randomness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotRng {
    s: [u64; 4],
}

impl BotRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `BotRng` instances created with the same seed will produce
    /// identical output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Seed from the system clock. Used by the binary when no fixed seed is
    /// configured; never used in tests.
    pub fn from_clock() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed);
        Self::new(nanos ^ u64::from(std::process::id()))
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// Uses the upper 53 bits of a `u64` to fill the mantissa of an f64.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }
}

impl RandomSource for BotRng {
    fn next_f64(&mut self) -> f64 {
        BotRng::next_f64(self)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.range_usize(0, len)
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// Lets tests pin down "always pick the third word" or "the trigger roll is
/// exactly 0" without reverse-engineering generator output.
#[derive(Clone, Debug)]
pub struct ScriptedSource {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// Panics if `values` is empty or any value is outside [0, 1).
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "ScriptedSource needs at least one value");
        assert!(
            values.iter().all(|v| (0.0..1.0).contains(v)),
            "ScriptedSource values must lie in [0, 1)"
        );
        Self { values, cursor: 0 }
    }

    /// A source that always returns the same draw.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws consumed so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedSource {
    fn next_f64(&mut self) -> f64 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
