use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Normal,
    Fire,
    Water,
    Electric,
    Grass,
    Ice,
    Fighting,
    Poison,
    Ground,
    Flying,
    Psychic,
    Bug,
    Rock,
    Ghost,
    Dragon,
    Steel,
    Dark,
    Fairy,
}

impl ElementType {
    pub const ALL: [ElementType; 18] = [
        ElementType::Normal,
        ElementType::Fire,
        ElementType::Water,
        ElementType::Electric,
        ElementType::Grass,
        ElementType::Ice,
        ElementType::Fighting,
        ElementType::Poison,
        ElementType::Ground,
        ElementType::Flying,
        ElementType::Psychic,
        ElementType::Bug,
        ElementType::Rock,
        ElementType::Ghost,
        ElementType::Dragon,
        ElementType::Steel,
        ElementType::Dark,
        ElementType::Fairy,
    ];

    /// Name used by PokeAPI (`"fire"`, `"psychic"`, ...).
    pub fn api_name(self) -> &'static str {
        match self {
            ElementType::Normal => "normal",
            ElementType::Fire => "fire",
            ElementType::Water => "water",
            ElementType::Electric => "electric",
            ElementType::Grass => "grass",
            ElementType::Ice => "ice",
            ElementType::Fighting => "fighting",
            ElementType::Poison => "poison",
            ElementType::Ground => "ground",
            ElementType::Flying => "flying",
            ElementType::Psychic => "psychic",
            ElementType::Bug => "bug",
            ElementType::Rock => "rock",
            ElementType::Ghost => "ghost",
            ElementType::Dragon => "dragon",
            ElementType::Steel => "steel",
            ElementType::Dark => "dark",
            ElementType::Fairy => "fairy",
        }
    }

    pub fn label(self) -> String {
        self.api_name().to_ascii_uppercase()
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown element type `{0}`")]
pub struct UnknownType(pub String);

impl FromStr for ElementType {
    type Err = UnknownType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ElementType::ALL
            .iter()
            .copied()
            .find(|element| element.api_name() == s)
            .ok_or_else(|| UnknownType(s.to_string()))
    }
}

const X: f32 = 0.0;
const H: f32 = 0.5;
const N: f32 = 1.0;
const S: f32 = 2.0;

// Rows are the attacking type, columns the defending type, both in `ElementType::ALL` order.
const CHART: [[f32; 18]; 18] = [
    [N, N, N, N, N, N, N, N, N, N, N, N, H, X, N, H, N, N], // normal
    [N, H, H, N, S, S, N, N, N, N, N, S, H, N, H, S, N, N], // fire
    [N, S, H, N, H, N, N, N, S, N, N, N, S, N, H, N, N, N], // water
    [N, N, S, H, H, N, N, N, X, S, N, N, N, N, H, N, N, N], // electric
    [N, H, S, N, H, N, N, H, S, H, N, H, S, N, H, H, N, N], // grass
    [N, H, H, N, S, H, N, N, S, S, N, N, N, N, S, H, N, N], // ice
    [S, N, N, N, N, S, N, H, N, H, H, H, S, X, N, S, S, H], // fighting
    [N, N, N, N, S, N, N, H, H, N, N, N, H, H, N, X, N, S], // poison
    [N, S, N, S, H, N, N, S, N, X, N, H, S, N, N, S, N, N], // ground
    [N, N, N, H, S, N, S, N, N, N, N, S, H, N, N, H, N, N], // flying
    [N, N, N, N, N, N, S, S, N, N, H, N, N, N, N, H, X, N], // psychic
    [N, H, N, N, S, N, H, H, N, H, S, N, N, H, N, H, S, H], // bug
    [N, S, N, N, N, S, H, N, H, S, N, S, N, N, N, H, N, N], // rock
    [X, N, N, N, N, N, N, N, N, N, S, N, N, S, N, N, H, N], // ghost
    [N, N, N, N, N, N, N, N, N, N, N, N, N, N, S, H, N, X], // dragon
    [N, H, H, H, N, S, N, N, N, N, N, N, S, N, N, H, N, S], // steel
    [N, N, N, N, N, N, H, N, N, N, S, N, N, S, N, N, H, H], // dark
    [N, H, N, N, N, N, S, H, N, N, N, N, N, N, S, H, S, N], // fairy
];

/// Single-type lookup: 0, 0.5, 1 or 2.
pub fn effectiveness(attacking: ElementType, defending: ElementType) -> f32 {
    CHART[attacking.index()][defending.index()]
}

/// Product of the per-type lookups across every defending type.
pub fn type_multiplier(attacking: ElementType, defending: &[ElementType]) -> f32 {
    defending
        .iter()
        .map(|element| effectiveness(attacking, *element))
        .product()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effectiveness {
    Immune,
    NotVery,
    Neutral,
    Super,
}

impl Effectiveness {
    pub fn classify(multiplier: f32) -> Self {
        if multiplier == 0.0 {
            Effectiveness::Immune
        } else if multiplier < 1.0 {
            Effectiveness::NotVery
        } else if multiplier > 1.0 {
            Effectiveness::Super
        } else {
            Effectiveness::Neutral
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            Effectiveness::Immune => Some("It had no effect..."),
            Effectiveness::NotVery => Some("It's not very effective..."),
            Effectiveness::Neutral => None,
            Effectiveness::Super => Some("It's super effective!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: [f32; 4] = [0.0, 0.5, 1.0, 2.0];
    const DUAL: [f32; 6] = [0.0, 0.25, 0.5, 1.0, 2.0, 4.0];

    #[test]
    fn test_single_lookups_stay_in_domain() {
        for attacking in ElementType::ALL {
            for defending in ElementType::ALL {
                let value = effectiveness(attacking, defending);
                assert!(
                    SINGLE.contains(&value),
                    "{attacking} vs {defending} gave {value}"
                );
            }
        }
    }

    #[test]
    fn test_dual_type_is_product_of_lookups() {
        for attacking in ElementType::ALL {
            for first in ElementType::ALL {
                for second in ElementType::ALL {
                    let value = type_multiplier(attacking, &[first, second]);
                    assert!(DUAL.contains(&value));
                    assert_eq!(
                        value,
                        effectiveness(attacking, first) * effectiveness(attacking, second)
                    );
                }
            }
        }
    }

    #[test]
    fn test_known_matchups() {
        use ElementType::*;
        assert_eq!(type_multiplier(Electric, &[Ground]), 0.0);
        assert_eq!(type_multiplier(Ice, &[Dragon, Flying]), 4.0);
        assert_eq!(type_multiplier(Fire, &[Water, Rock]), 0.25);
        assert_eq!(type_multiplier(Fighting, &[Normal]), 2.0);
        assert_eq!(type_multiplier(Dragon, &[Fairy]), 0.0);
        assert_eq!(type_multiplier(Normal, &[]), 1.0);
    }

    #[test]
    fn test_parse_api_names() {
        assert_eq!("psychic".parse::<ElementType>(), Ok(ElementType::Psychic));
        assert_eq!(
            "shadow".parse::<ElementType>(),
            Err(UnknownType("shadow".to_string()))
        );
        for element in ElementType::ALL {
            assert_eq!(element.api_name().parse::<ElementType>(), Ok(element));
        }
    }

    #[test]
    fn test_classify_multiplier() {
        assert_eq!(Effectiveness::classify(0.0), Effectiveness::Immune);
        assert_eq!(Effectiveness::classify(0.25), Effectiveness::NotVery);
        assert_eq!(Effectiveness::classify(1.0), Effectiveness::Neutral);
        assert_eq!(Effectiveness::classify(4.0), Effectiveness::Super);
        assert!(Effectiveness::Neutral.message().is_none());
    }
}
