use serde::{Deserialize, Serialize};

use crate::creature::{Creature, MegaForm, Side};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[action(infer_categories)]
pub enum Action {
    Init,
    UiTerminalResize(u16, u16),
    Tick,

    // Team loading
    TeamsDidLoad {
        player: Vec<Creature>,
        enemy: Vec<Creature>,
    },
    TeamsDidError(String),

    // Mega evolution form fetch
    MegaFormDidLoad {
        side: Side,
        form: MegaForm,
    },
    MegaFormDidError {
        side: Side,
        error: String,
    },

    // Battle input
    BattleCursorNext,
    BattleCursorPrev,
    BattleConfirm,
    BattleBack,
    BattleMegaToggle,

    // Battle commands
    DialogAdvance,
    ExecuteTurn(usize),
    SwitchTo(usize),
    ThrowBall,

    Quit,
}
