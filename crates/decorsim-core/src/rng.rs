//! Deterministic PRNG for simulation jitter.
//!
//! Uses the SplitMix64 algorithm: 8 bytes of state, trivially serializable,
//! identical sequences on every platform.

use crate::pos::BlockPos;

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

    /// Seed an RNG from a block position so that every device gets its own
    /// reproducible stream.
    pub fn for_position(pos: BlockPos) -> Self {
        let seed = (pos.x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (pos.y as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ (pos.z as i64 as u64).wrapping_mul(0x1656_67B1_9E37_79F9);
        Self::new(seed)
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// A fair coin flip: 0 or 1.
    pub fn coin(&mut self) -> u32 {
        (self.next_u64() >> 63) as u32
    }

    /// Get the internal state (for hashing/serialization).
    pub fn state(&self) -> u64 {
        self.state
    }
}
