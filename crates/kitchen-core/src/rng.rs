//! Deterministic PRNG for recipe draws and dialogue timing.
//!
//! Uses the SplitMix64 algorithm: fast, 8 bytes of state, and trivially
//! serializable, so a seeded session replays the same orders.

use crate::fixed::Fixed64;

/// SplitMix64 pseudo-random number generator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a new RNG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform index in `0..len`. Returns `None` for an empty range.
    pub fn next_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        // Multiply-shift on the upper 32 bits: bias is negligible for
        // catalog-sized ranges.
        let upper = self.next_u64() >> 32;
        Some(((upper * len as u64) >> 32) as usize)
    }

    /// Uniform value in `[lo, hi)`. Returns `lo` if the range is empty.
    pub fn range(&mut self, lo: Fixed64, hi: Fixed64) -> Fixed64 {
        if hi <= lo {
            return lo;
        }
        // Lower 32 bits of a Q32.32 value are the fraction, so a raw u32
        // is a uniform sample of [0, 1).
        let frac = Fixed64::from_bits((self.next_u64() >> 32) as i64);
        lo + (hi - lo) * frac
    }

    /// Get the internal state (for snapshots).
    pub fn state(&self) -> u64 {
        self.state
    }
}
