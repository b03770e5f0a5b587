/// Seeded linear-congruential sequence (Park–Miller multiplier)
///
/// State: i32, wrapping on overflow
/// Remainder: truncating, sign follows the dividend (state may be negative)
/// Output: `state / DENOMINATOR + 0.5`, always in the open interval (0, 1)
///
/// The first state is derived with `(seed + MODULUS) * MULTIPLIER % MODULUS`,
/// every later one with `state * MULTIPLIER % MODULUS`. Peers computing with
/// 32-bit `int` arithmetic reproduce the same stream.
pub const MODULUS: i32 = 2_147_483_647;
pub const MULTIPLIER: i32 = 48_271;
pub const DENOMINATOR: f64 = 4_294_967_294.0;

/// One-time seed update applied before the first value is drawn.
#[inline]
pub fn prime(seed: i32) -> i32 {
    seed.wrapping_add(MODULUS).wrapping_mul(MULTIPLIER) % MODULUS
}

/// State update applied after every drawn value.
#[inline]
pub fn advance(state: i32) -> i32 {
    state.wrapping_mul(MULTIPLIER) % MODULUS
}

/// Draws the value for `state` and returns it with the advanced state.
#[inline]
pub fn step(state: i32) -> (f64, i32) {
    let value = f64::from(state) / DENOMINATOR + 0.5;
    (value, advance(state))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeterministicSequence {
    state: i32,
}

impl DeterministicSequence {
    /// Start a fresh sequence; the seed is primed once.
    pub fn from_seed(seed: i32) -> Self {
        Self { state: prime(seed) }
    }

    /// Continue a sequence from a state previously returned by [`state`](Self::state).
    /// No priming is applied.
    pub fn resume(state: i32) -> Self {
        Self { state }
    }

    /// Current state, i.e. the state the next draw will read.
    pub fn state(&self) -> i32 {
        self.state
    }

    pub fn next_value(&mut self) -> f64 {
        let (value, state) = step(self.state);
        self.state = state;
        value
    }
}

impl Iterator for DeterministicSequence {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_value())
    }
}
