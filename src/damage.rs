use crate::creature::{Creature, DamageClass, Move};
use crate::rng::RollSource;
use crate::types::type_multiplier;

/// Every creature battles at this level.
pub const BATTLE_LEVEL: u32 = 50;
const STAB: f64 = 1.5;
const ROLL_STEPS: u32 = 16;
const ROLL_FLOOR: u32 = 85;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageOutcome {
    pub damage: u32,
    pub multiplier: f32,
}

/// Level-50 base damage before STAB, the random roll and typing.
pub fn base_damage(power: u16, attack: u16, defense: u16) -> u32 {
    let level_factor = 2 * BATTLE_LEVEL / 5 + 2;
    let defense = u64::from(defense.max(1));
    let scaled = u64::from(level_factor) * u64::from(power) * u64::from(attack) / defense / 50;
    scaled as u32 + 2
}

pub fn calc_damage(
    attacker: &Creature,
    defender: &Creature,
    mv: &Move,
    rolls: &mut impl RollSource,
) -> DamageOutcome {
    let (attack, defense) = match mv.damage_class {
        DamageClass::Physical => (attacker.stats.attack, defender.stats.defense),
        DamageClass::Special | DamageClass::Status => {
            (attacker.stats.sp_attack, defender.stats.sp_defense)
        }
    };
    let base = base_damage(mv.power, attack, defense);
    let stab = if attacker.types.contains(&mv.element) {
        STAB
    } else {
        1.0
    };
    let random = f64::from(ROLL_FLOOR + rolls.roll(ROLL_STEPS)) / 100.0;
    let multiplier = type_multiplier(mv.element, &defender.types);
    let damage = (f64::from(base) * stab * random * f64::from(multiplier)).floor();
    DamageOutcome {
        damage: damage.max(0.0) as u32,
        multiplier,
    }
}
