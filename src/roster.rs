use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rng::RollSource;

/// Highest national dex id drawn for random slots (gen 5 has animated sprites).
pub const MAX_DEX_ID: u32 = 649;

/// Mewtwo, Latias, Latios, Kyogre, Groudon, Rayquaza.
pub const MEGA_LEGENDARIES: [u32; 6] = [150, 384, 380, 381, 382, 383];

pub const STANDARD_MEGA_CAPABLE: [u32; 41] = [
    3, 6, 9, 15, 18, 65, 80, 94, 115, 127, 130, 142, // gen 1
    181, 208, 212, 214, 229, 248, // gen 2
    254, 257, 260, 282, 302, 303, 306, 308, 310, 319, 323, 334, 354, 359, 362, 373, 376, // gen 3
    428, 445, 448, 460, 475, // gen 4
    531, // gen 5
];

pub const MAX_TEAM_SIZE: usize = 6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RosterKind {
    /// Two legendary megas, the rest standard mega-capable species.
    #[default]
    MegaCapable,
    /// One legendary, two standard megas, the rest anything up to gen 5.
    Random,
}

impl RosterKind {
    pub fn pick(self, size: usize, rng: &mut impl RollSource) -> Vec<u32> {
        match self {
            RosterKind::MegaCapable => mega_capable_roster(size, rng),
            RosterKind::Random => random_roster(size, rng),
        }
    }
}

pub fn mega_capable_roster(size: usize, rng: &mut impl RollSource) -> Vec<u32> {
    let size = size.clamp(1, MAX_TEAM_SIZE);
    let legendary_count = size.min(2);
    let mut ids = sample(&MEGA_LEGENDARIES, legendary_count, rng);
    ids.extend(sample(&STANDARD_MEGA_CAPABLE, size - legendary_count, rng));
    ids
}

pub fn random_roster(size: usize, rng: &mut impl RollSource) -> Vec<u32> {
    let size = size.clamp(1, MAX_TEAM_SIZE);
    let mut ids = sample(&MEGA_LEGENDARIES, 1, rng);
    ids.extend(sample(&STANDARD_MEGA_CAPABLE, (size - 1).min(2), rng));
    while ids.len() < size {
        ids.push(rng.roll(MAX_DEX_ID) + 1);
    }
    ids
}

/// `count` distinct entries of `pool` via a partial Fisher-Yates shuffle.
fn sample(pool: &[u32], count: usize, rng: &mut impl RollSource) -> Vec<u32> {
    let mut pool = pool.to_vec();
    let count = count.min(pool.len());
    for i in 0..count {
        let remaining = (pool.len() - i) as u32;
        let j = i + rng.roll(remaining) as usize;
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool
}
