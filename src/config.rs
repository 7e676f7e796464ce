//! RON settings file loaded once at startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::{ApiConfig, DEFAULT_API_BASE};
use crate::roster::{RosterKind, MAX_TEAM_SIZE};
use crate::state::Rules;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    pub api_base: String,
    pub languages: Vec<String>,
    pub cache: bool,
    pub team_size: usize,
    pub enemy_roster: RosterKind,
    pub enemy_mega_chance: u8,
    pub opponent: String,
}

impl Default for BattleConfig {
    fn default() -> Self {
        let rules = Rules::default();
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            languages: vec!["en".to_string()],
            cache: true,
            team_size: rules.team_size,
            enemy_roster: rules.enemy_roster,
            enemy_mega_chance: rules.enemy_mega_chance,
            opponent: rules.opponent,
        }
    }
}

impl BattleConfig {
    /// Defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TEAM_SIZE).contains(&self.team_size) {
            return Err(ConfigError::Invalid(format!(
                "team_size must be between 1 and {MAX_TEAM_SIZE}, got {}",
                self.team_size
            )));
        }
        if self.enemy_mega_chance > 100 {
            return Err(ConfigError::Invalid(format!(
                "enemy_mega_chance is a percentage, got {}",
                self.enemy_mega_chance
            )));
        }
        if self.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base is empty".to_string()));
        }
        Ok(())
    }

    pub fn rules(&self) -> Rules {
        Rules {
            team_size: self.team_size,
            enemy_roster: self.enemy_roster,
            enemy_mega_chance: self.enemy_mega_chance,
            opponent: self.opponent.clone(),
        }
    }

    pub fn api(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base.trim_end_matches('/').to_string(),
            languages: self.languages.clone(),
            cache: self.cache,
        }
    }
}
