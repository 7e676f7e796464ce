use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::ElementType;

const SPRITE_BASE_CLASSIC: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/versions/generation-v/black-white/animated/";
const SPRITE_BASE_SHOWDOWN: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/showdown/";

/// Alternate forms (megas, primals) live above this id in PokeAPI.
pub const FORM_ID_OFFSET: u32 = 10000;

/// Kyogre and Groudon revert to a primal form instead of a mega.
const PRIMAL_SPECIES: [u32; 2] = [382, 383];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Enemy => "enemy",
        }
    }

    pub fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DamageClass {
    Physical,
    Special,
    Status,
}

impl FromStr for DamageClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "physical" => Ok(DamageClass::Physical),
            "special" => Ok(DamageClass::Special),
            "status" => Ok(DamageClass::Status),
            other => Err(format!("unknown damage class `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Move {
    pub name: String,
    pub power: u16,
    pub accuracy: u8,
    pub element: ElementType,
    pub pp: u8,
    pub max_pp: u8,
    pub priority: i8,
    pub damage_class: DamageClass,
}

impl Move {
    /// Given to creatures whose move pool has nothing with a damage value.
    pub fn tackle() -> Self {
        Self {
            name: "Tackle".to_string(),
            power: 40,
            accuracy: 100,
            element: ElementType::Normal,
            pp: 35,
            max_pp: 35,
            priority: 0,
            damage_class: DamageClass::Physical,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BaseStats {
    pub hp: u16,
    pub attack: u16,
    pub defense: u16,
    pub sp_attack: u16,
    pub sp_defense: u16,
    pub speed: u16,
}

pub fn max_hp_for(base_hp: u16) -> u16 {
    base_hp.saturating_mul(2).saturating_add(110)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SpriteRefs {
    pub front: String,
    pub back: String,
}

impl SpriteRefs {
    pub fn for_id(id: u32) -> Self {
        Self {
            front: sprite_url(id, false),
            back: sprite_url(id, true),
        }
    }
}

pub fn sprite_url(id: u32, back: bool) -> String {
    let base = if id > FORM_ID_OFFSET {
        SPRITE_BASE_SHOWDOWN
    } else {
        SPRITE_BASE_CLASSIC
    };
    let facing = if back { "back/" } else { "" };
    format!("{base}{facing}{id}.gif")
}

/// Stats, typing and sprites of an alternate form, fetched when a creature
/// mega evolves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MegaForm {
    pub id: u32,
    pub types: Vec<ElementType>,
    pub stats: BaseStats,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Creature {
    pub id: u32,
    pub name: String,
    pub types: Vec<ElementType>,
    pub stats: BaseStats,
    pub current_hp: u16,
    pub max_hp: u16,
    pub moves: Vec<Move>,
    pub sprites: SpriteRefs,
    pub is_fainted: bool,
    #[serde(default)]
    pub mega_id: Option<u32>,
    #[serde(default)]
    pub is_mega: bool,
    #[serde(default)]
    pub caught: bool,
}

impl Creature {
    pub fn new(
        id: u32,
        name: String,
        types: Vec<ElementType>,
        stats: BaseStats,
        moves: Vec<Move>,
    ) -> Self {
        let max_hp = max_hp_for(stats.hp);
        let moves = if moves.is_empty() {
            vec![Move::tackle()]
        } else {
            moves
        };
        Self {
            id,
            name,
            types,
            stats,
            current_hp: max_hp,
            max_hp,
            moves,
            sprites: SpriteRefs::for_id(id),
            is_fainted: false,
            mega_id: None,
            is_mega: false,
            caught: false,
        }
    }

    pub fn with_mega(mut self, mega_id: Option<u32>) -> Self {
        self.mega_id = mega_id;
        self
    }

    pub fn can_mega_evolve(&self) -> bool {
        self.mega_id.is_some() && !self.is_mega && !self.is_fainted
    }

    /// Subtracts up to `amount` HP and returns what was actually taken.
    /// A fainted creature takes nothing.
    pub fn apply_damage(&mut self, amount: u32) -> u16 {
        if self.is_fainted {
            return 0;
        }
        let dealt = amount.min(u32::from(self.current_hp)) as u16;
        self.current_hp -= dealt;
        if self.current_hp == 0 {
            self.is_fainted = true;
        }
        dealt
    }

    /// Strictly below a fifth of max HP.
    pub fn is_catchable(&self) -> bool {
        u32::from(self.current_hp) * 5 < u32::from(self.max_hp)
    }

    pub fn mark_caught(&mut self) {
        self.caught = true;
        self.current_hp = 0;
        self.is_fainted = true;
    }

    /// Replaces stats, typing and sprites with `form`, keeping the HP ratio and
    /// the move set. One-way: a creature that already evolved is left alone.
    pub fn mega_evolve(&mut self, form: MegaForm) -> bool {
        if self.is_mega || self.is_fainted {
            return false;
        }
        let new_max = max_hp_for(form.stats.hp);
        let scaled = if self.max_hp == 0 {
            new_max
        } else {
            (u32::from(new_max) * u32::from(self.current_hp) / u32::from(self.max_hp)) as u16
        };
        let prefix = if PRIMAL_SPECIES.contains(&self.id) {
            "Primal"
        } else {
            "Mega"
        };
        self.name = format!("{prefix} {}", self.name);
        if !form.types.is_empty() {
            self.types = form.types;
        }
        self.stats = form.stats;
        self.max_hp = new_max;
        self.current_hp = scaled.clamp(1, new_max.max(1));
        self.sprites = SpriteRefs::for_id(form.id);
        self.is_mega = true;
        true
    }

    /// Lost for the rest of the battle when the alternate form can't be loaded.
    pub fn forfeit_mega(&mut self) {
        self.mega_id = None;
    }

    pub fn hp_ratio(&self) -> f32 {
        if self.max_hp == 0 {
            return 0.0;
        }
        f32::from(self.current_hp) / f32::from(self.max_hp)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SwitchError {
    #[error("there is no party slot {0}")]
    OutOfRange(usize),
    #[error("{0} is already in battle!")]
    AlreadyActive(String),
    #[error("{0} has no energy left to battle!")]
    Fainted(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Team {
    pub members: Vec<Creature>,
    pub active: usize,
}

impl Team {
    pub fn new(members: Vec<Creature>) -> Self {
        Self { members, active: 0 }
    }

    pub fn active(&self) -> Option<&Creature> {
        self.members.get(self.active)
    }

    pub fn active_mut(&mut self) -> Option<&mut Creature> {
        self.members.get_mut(self.active)
    }

    pub fn active_fainted(&self) -> bool {
        self.active().map(|creature| creature.is_fainted).unwrap_or(true)
    }

    pub fn is_defeated(&self) -> bool {
        self.members.iter().all(|creature| creature.is_fainted)
    }

    /// First member, by ascending slot, still able to battle.
    pub fn next_available(&self) -> Option<usize> {
        self.members.iter().position(|creature| !creature.is_fainted)
    }

    pub fn check_switch(&self, index: usize) -> Result<(), SwitchError> {
        let creature = self
            .members
            .get(index)
            .ok_or(SwitchError::OutOfRange(index))?;
        if creature.is_fainted {
            return Err(SwitchError::Fainted(creature.name.clone()));
        }
        if index == self.active {
            return Err(SwitchError::AlreadyActive(creature.name.clone()));
        }
        Ok(())
    }
}
