//! Record id generation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Generates prefixed record ids such as `sim-3f9a0c...`.
///
/// Seeded generators are reproducible, which keeps tests deterministic.
#[derive(Clone, Debug)]
pub struct IdGen {
    rng: ChaCha8Rng,
}

impl IdGen {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from the thread-local entropy source.
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    pub fn next_id(&mut self, prefix: &str) -> String {
        let n: u64 = self.rng.gen();
        format!("{prefix}-{n:016x}")
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::from_entropy()
    }
}
