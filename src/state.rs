use std::collections::VecDeque;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch::DataResource;
use tui_dispatch_debug::debug::{ron_string, DebugSection, DebugState};

use crate::creature::{Creature, MegaForm, Side, Team};
use crate::rng::BattleRng;
use crate::roster::{RosterKind, MAX_TEAM_SIZE};
use crate::timeline::Timeline;
use crate::types::ElementType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattlePhase {
    Start,
    Menu,
    MoveSelection,
    AttackAnimation,
    TextProcessing,
    Switch,
    Bag,
    Victory,
    Defeat,
}

impl BattlePhase {
    pub fn is_over(self) -> bool {
        matches!(self, BattlePhase::Victory | BattlePhase::Defeat)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MenuOption {
    Fight,
    Bag,
    Party,
    Run,
}

impl MenuOption {
    pub const ALL: [MenuOption; 4] = [
        MenuOption::Fight,
        MenuOption::Bag,
        MenuOption::Party,
        MenuOption::Run,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuOption::Fight => "FIGHT",
            MenuOption::Bag => "BAG",
            MenuOption::Party => "POKéMON",
            MenuOption::Run => "RUN",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CreatureAnim {
    #[default]
    Idle,
    Attacking,
    Hit,
    Fainted,
    Mega,
    Recall,
    Release,
    Capture,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CutsceneStage {
    Activation,
    Encasement,
    Burst,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MegaCutscene {
    pub side: Side,
    pub stage: CutsceneStage,
    pub element: ElementType,
    pub name: String,
}

/// Alternate form request backing the cutscene's burst step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum MegaFetch {
    #[default]
    Idle,
    InFlight(Side),
    Ready(Side, MegaForm),
    Failed(Side),
}

/// Battle tuning that outlives a single battle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rules {
    pub team_size: usize,
    pub enemy_roster: RosterKind,
    /// Percent chance the opposing trainer mega evolves when it can.
    pub enemy_mega_chance: u8,
    pub opponent: String,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            team_size: MAX_TEAM_SIZE,
            enemy_roster: RosterKind::MegaCapable,
            enemy_mega_chance: 70,
            opponent: "N".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleState {
    pub phase: BattlePhase,
    pub player: Team,
    pub enemy: Team,
    pub dialog_queue: VecDeque<String>,
    pub current_dialog: String,
    pub turn: u32,
    /// Player asked to mega evolve with the next attack.
    pub mega_pending: bool,
    pub menu_index: usize,
    pub move_index: usize,
    pub switch_index: usize,
    /// Switch screen opened because the active creature fainted.
    pub forced_switch: bool,
    pub player_anim: CreatureAnim,
    pub enemy_anim: CreatureAnim,
    pub active_move_type: Option<ElementType>,
    pub cutscene: Option<MegaCutscene>,
    pub mega_fetch: MegaFetch,
    pub timeline: Timeline,
    pub rng: BattleRng,
    pub enemy_mega_chance: u8,
    pub opponent: String,
}

impl BattleState {
    pub fn new(player: Team, enemy: Team, rng: BattleRng, rules: &Rules) -> Self {
        let mut dialog_queue = VecDeque::new();
        dialog_queue.push_back(format!("Trainer {} wants to battle!", rules.opponent));
        if let Some(lead) = enemy.active() {
            dialog_queue.push_back(format!("Trainer {} sent out {}!", rules.opponent, lead.name));
        }
        if let Some(lead) = player.active() {
            dialog_queue.push_back(format!("Go! {}!", lead.name));
        }
        Self {
            phase: BattlePhase::Start,
            player,
            enemy,
            dialog_queue,
            current_dialog: String::new(),
            turn: 0,
            mega_pending: false,
            menu_index: 0,
            move_index: 0,
            switch_index: 0,
            forced_switch: false,
            player_anim: CreatureAnim::Idle,
            enemy_anim: CreatureAnim::Idle,
            active_move_type: None,
            cutscene: None,
            mega_fetch: MegaFetch::Idle,
            timeline: Timeline::default(),
            rng,
            enemy_mega_chance: rules.enemy_mega_chance,
            opponent: rules.opponent.clone(),
        }
    }

    pub fn team(&self, side: Side) -> &Team {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    pub fn team_mut(&mut self, side: Side) -> &mut Team {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    pub fn anim(&self, side: Side) -> CreatureAnim {
        match side {
            Side::Player => self.player_anim,
            Side::Enemy => self.enemy_anim,
        }
    }

    pub fn set_anim(&mut self, side: Side, anim: CreatureAnim) {
        match side {
            Side::Player => self.player_anim = anim,
            Side::Enemy => self.enemy_anim = anim,
        }
    }

    pub fn active_player(&self) -> Option<&Creature> {
        self.player.active()
    }

    /// Display name, prefixed for the opposing side.
    pub fn display_name(&self, side: Side) -> String {
        let name = self
            .team(side)
            .active()
            .map(|creature| creature.name.clone())
            .unwrap_or_default();
        match side {
            Side::Player => name,
            Side::Enemy => format!("The opposing {name}"),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase == BattlePhase::AttackAnimation
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub battle: DataResource<BattleState>,
    pub rules: Rules,
    pub rng: BattleRng,
    pub tick: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Rules::default(), BattleRng::from_time())
    }
}

impl AppState {
    pub fn new(rules: Rules, rng: BattleRng) -> Self {
        Self {
            terminal_size: (80, 24),
            battle: DataResource::Empty,
            rules,
            rng,
            tick: 0,
        }
    }

    pub fn battle(&self) -> Option<&BattleState> {
        match &self.battle {
            DataResource::Loaded(battle) => Some(battle),
            _ => None,
        }
    }

    pub fn battle_mut(&mut self) -> Option<&mut BattleState> {
        match &mut self.battle {
            DataResource::Loaded(battle) => Some(battle),
            _ => None,
        }
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = vec![DebugSection::new("App")
            .entry("battle_loaded", ron_string(&self.battle.is_loaded()))
            .entry("battle_error", ron_string(&self.battle.error()))
            .entry("rules", ron_string(&self.rules))
            .entry("tick", ron_string(&self.tick))];

        if let Some(battle) = self.battle() {
            sections.push(
                DebugSection::new("Battle")
                    .entry("phase", ron_string(&battle.phase))
                    .entry("turn", ron_string(&battle.turn))
                    .entry("dialog", ron_string(&battle.current_dialog))
                    .entry("queued", ron_string(&battle.dialog_queue.len()))
                    .entry("mega_pending", ron_string(&battle.mega_pending))
                    .entry("mega_fetch", ron_string(&battle.mega_fetch))
                    .entry("timeline", ron_string(&battle.timeline.len())),
            );
            for side in [Side::Player, Side::Enemy] {
                let team = battle.team(side);
                let mut section = DebugSection::new(if side == Side::Player {
                    "Player"
                } else {
                    "Enemy"
                })
                .entry("active", ron_string(&team.active))
                .entry("anim", ron_string(&battle.anim(side)));
                if let Some(creature) = team.active() {
                    section = section
                        .entry("name", ron_string(&creature.name))
                        .entry("hp", ron_string(&(creature.current_hp, creature.max_hp)))
                        .entry("stats", ron_string(&creature.stats))
                        .entry("is_mega", ron_string(&creature.is_mega));
                }
                sections.push(section);
            }
        }

        sections
    }
}
