//! Seeded randomness for live ticks and toy draws.
//!
//! Each concern gets its own stream derived from one session seed, so a toy
//! purchase never shifts the sequence of happiness rolls and vice versa.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use sha2::Sha256;

const TICK_STREAM: &[u8] = b"tick";
const TOY_STREAM: &[u8] = b"toy";

#[derive(Debug, Clone)]
pub struct CareRng {
    tick: CountingRng<SmallRng>,
    toy: CountingRng<SmallRng>,
}

impl CareRng {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            tick: CountingRng::new(derive_stream_seed(seed, TICK_STREAM)),
            toy: CountingRng::new(derive_stream_seed(seed, TOY_STREAM)),
        }
    }

    pub const fn tick(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.tick
    }

    pub const fn toy(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.toy
    }

    /// Total draws across both streams.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.tick.draws().saturating_add(self.toy.draws())
    }
}

/// Rng wrapper that counts draw calls.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// HMAC-SHA256 of the stream tag keyed by the seed, truncated to 64 bits.
#[must_use]
pub fn derive_stream_seed(seed: u64, tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so the error arm is unreachable.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()) else {
        return seed;
    };
    mac.update(tag);
    let digest = mac.finalize().into_bytes();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
