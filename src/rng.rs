use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Source of battle randomness. Damage rolls, AI choices and roster picks all
/// go through this so tests can pin the outcome.
pub trait RollSource {
    /// Uniform value in `0..bound`; `0` when `bound` is `0`.
    fn roll(&mut self, bound: u32) -> u32;

    /// True with roughly `percent`% probability.
    fn chance(&mut self, percent: u8) -> bool {
        self.roll(100) < u32::from(percent)
    }
}

/// Linear congruential generator kept inside the state so debug snapshots and
/// replays reproduce the same battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BattleRng {
    seed: u64,
}

impl BattleRng {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_time() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::new((now.as_secs() << 32) ^ now.subsec_nanos() as u64)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.seed = self
            .seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.seed >> 32) as u32
    }

    pub fn next_u64(&mut self) -> u64 {
        (u64::from(self.next_u32()) << 32) | u64::from(self.next_u32())
    }

    /// Independent generator for a sub-system (one battle, one roster draw).
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_u64())
    }
}

impl Default for BattleRng {
    fn default() -> Self {
        Self::from_time()
    }
}

impl RollSource for BattleRng {
    fn roll(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.next_u32() % bound
    }
}
