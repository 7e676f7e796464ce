//! Turn engine: dialog draining, turn ordering and the scripted switch, catch
//! and mega evolution sequences. Everything timed goes through the battle's
//! [`Timeline`](crate::timeline::Timeline).

use tui_dispatch::DispatchResult;

use crate::creature::{MegaForm, Side};
use crate::damage::calc_damage;
use crate::effect::Effect;
use crate::rng::RollSource;
use crate::state::{
    BattlePhase, BattleState, CreatureAnim, CutsceneStage, MegaCutscene, MegaFetch, MenuOption,
};
use crate::timeline::TurnStep;
use crate::types::{ElementType, Effectiveness};

pub const MEGA_ENCASE_MS: u32 = 400;
pub const MEGA_BURST_MS: u32 = 800;
pub const MEGA_FINISH_MS: u32 = 1200;
pub const ANNOUNCE_MS: u32 = 800;
pub const RECOVER_MS: u32 = 600;
pub const RECALL_MS: u32 = 1000;
pub const SEND_OUT_MS: u32 = 1200;
pub const CATCH_SHAKE_MS: u32 = 800;
pub const CATCH_RESOLVE_MS: u32 = 2000;
pub const CATCH_FAIL_MS: u32 = 1000;
pub const RELEASE_IDLE_MS: u32 = 1000;

enum Flow {
    Continue,
    Blocked,
}

/// Shows the next queued line, or decides what comes after the dialog.
pub fn advance_dialog(battle: &mut BattleState) -> DispatchResult<Effect> {
    if !matches!(battle.phase, BattlePhase::Start | BattlePhase::TextProcessing) {
        return DispatchResult::unchanged();
    }
    if let Some(line) = battle.dialog_queue.pop_front() {
        battle.current_dialog = line;
        battle.phase = BattlePhase::TextProcessing;
        return DispatchResult::changed();
    }
    drain(battle);
    DispatchResult::changed()
}

fn drain(battle: &mut BattleState) {
    if battle.player.active_fainted() {
        if battle.player.is_defeated() {
            battle.phase = BattlePhase::Defeat;
            battle.current_dialog = "You have no more Pokémon that can fight... You blacked out!"
                .to_string();
            log::info!("battle lost after {} turns", battle.turn);
            return;
        }
        battle.phase = BattlePhase::Switch;
        battle.forced_switch = true;
        battle.switch_index = battle.player.next_available().unwrap_or(0);
        battle.current_dialog = "Choose your next Pokémon.".to_string();
        return;
    }

    if battle.enemy.active_fainted() {
        match battle.enemy.next_available() {
            None => {
                battle.phase = BattlePhase::Victory;
                battle.current_dialog = format!("You defeated Trainer {}!", battle.opponent);
                log::info!("battle won after {} turns", battle.turn);
            }
            Some(next) => {
                battle.enemy.active = next;
                battle.phase = BattlePhase::Start;
                let name = battle
                    .enemy
                    .active()
                    .map(|creature| creature.name.clone())
                    .unwrap_or_default();
                battle
                    .dialog_queue
                    .push_back(format!("Trainer {} sent out {}!", battle.opponent, name));
                battle.enemy_anim = CreatureAnim::Release;
                battle
                    .timeline
                    .push(RELEASE_IDLE_MS, TurnStep::Idle(Side::Enemy));
            }
        }
        return;
    }

    open_menu(battle);
}

fn open_menu(battle: &mut BattleState) {
    battle.phase = BattlePhase::Menu;
    battle.forced_switch = false;
    battle.current_dialog = format!("What will {} do?", battle.display_name(Side::Player));
}

pub fn select_option(battle: &mut BattleState, option: MenuOption) -> DispatchResult<Effect> {
    if battle.phase != BattlePhase::Menu {
        return DispatchResult::unchanged();
    }
    match option {
        MenuOption::Fight => {
            battle.phase = BattlePhase::MoveSelection;
            let moves = battle.player.active().map(|c| c.moves.len()).unwrap_or(0);
            if battle.move_index >= moves {
                battle.move_index = 0;
            }
        }
        MenuOption::Bag => {
            battle.phase = BattlePhase::Bag;
            battle.current_dialog = "Throw a Poké Ball?".to_string();
        }
        MenuOption::Party => {
            battle.phase = BattlePhase::Switch;
            battle.forced_switch = false;
            battle.switch_index = battle.player.active;
            battle.current_dialog = "Choose a Pokémon.".to_string();
        }
        MenuOption::Run => {
            battle.current_dialog = "No! There's no running from a Trainer battle!".to_string();
        }
    }
    DispatchResult::changed()
}

/// Leaves a sub-menu. A forced switch can't be backed out of.
pub fn back(battle: &mut BattleState) -> DispatchResult<Effect> {
    match battle.phase {
        BattlePhase::MoveSelection => {
            battle.mega_pending = false;
            open_menu(battle);
        }
        BattlePhase::Bag => open_menu(battle),
        BattlePhase::Switch if !battle.forced_switch => open_menu(battle),
        _ => return DispatchResult::unchanged(),
    }
    DispatchResult::changed()
}

pub fn toggle_mega(battle: &mut BattleState) -> DispatchResult<Effect> {
    if battle.phase != BattlePhase::MoveSelection {
        return DispatchResult::unchanged();
    }
    let capable = battle
        .player
        .active()
        .map(|creature| creature.can_mega_evolve())
        .unwrap_or(false);
    if !capable {
        return DispatchResult::unchanged();
    }
    battle.mega_pending = !battle.mega_pending;
    DispatchResult::changed()
}

pub fn move_cursor(battle: &mut BattleState, delta: i32) -> DispatchResult<Effect> {
    let (len, index) = match battle.phase {
        BattlePhase::Menu => (MenuOption::ALL.len(), &mut battle.menu_index),
        BattlePhase::MoveSelection => (
            battle.player.active().map(|c| c.moves.len()).unwrap_or(0),
            &mut battle.move_index,
        ),
        BattlePhase::Switch => (battle.player.members.len(), &mut battle.switch_index),
        _ => return DispatchResult::unchanged(),
    };
    if len < 2 {
        return DispatchResult::unchanged();
    }
    let next = (*index as i32 + delta).rem_euclid(len as i32) as usize;
    if next == *index {
        return DispatchResult::unchanged();
    }
    *index = next;
    DispatchResult::changed()
}

pub fn confirm(battle: &mut BattleState) -> DispatchResult<Effect> {
    match battle.phase {
        BattlePhase::Start | BattlePhase::TextProcessing => advance_dialog(battle),
        BattlePhase::Menu => {
            let option = MenuOption::ALL[battle.menu_index.min(MenuOption::ALL.len() - 1)];
            select_option(battle, option)
        }
        BattlePhase::MoveSelection => {
            let index = battle.move_index;
            execute_turn(battle, index)
        }
        BattlePhase::Switch => {
            let index = battle.switch_index;
            switch_to(battle, index)
        }
        BattlePhase::Bag => throw_ball(battle),
        BattlePhase::AttackAnimation | BattlePhase::Victory | BattlePhase::Defeat => {
            DispatchResult::unchanged()
        }
    }
}

fn mega_steps(side: Side) -> [(u32, TurnStep); 4] {
    [
        (0, TurnStep::MegaActivate(side)),
        (MEGA_ENCASE_MS, TurnStep::MegaEncase(side)),
        (MEGA_BURST_MS, TurnStep::MegaBurst(side)),
        (MEGA_FINISH_MS, TurnStep::MegaFinish(side)),
    ]
}

fn attack_steps(side: Side, move_index: usize) -> [(u32, TurnStep); 3] {
    [
        (0, TurnStep::Announce { side, move_index }),
        (ANNOUNCE_MS, TurnStep::Strike { side, move_index }),
        (RECOVER_MS, TurnStep::Recover { side }),
    ]
}

/// Starts a turn with the player's chosen move. Only valid from move selection.
pub fn execute_turn(battle: &mut BattleState, move_index: usize) -> DispatchResult<Effect> {
    if battle.phase != BattlePhase::MoveSelection {
        return DispatchResult::unchanged();
    }
    let Some(player) = battle.player.active() else {
        return DispatchResult::unchanged();
    };
    if move_index >= player.moves.len() {
        return DispatchResult::unchanged();
    }
    let player_mega = battle.mega_pending && player.can_mega_evolve();

    finish_idle_resets(battle);
    battle.phase = BattlePhase::AttackAnimation;
    battle.turn += 1;
    battle.mega_pending = false;

    let mut steps = Vec::new();
    if player_mega {
        steps.extend(mega_steps(Side::Player));
    }
    steps.push((0, TurnStep::EnemyMegaRoll));
    steps.push((
        0,
        TurnStep::ChooseOrder {
            player_move: move_index,
        },
    ));
    battle.timeline.push_front_all(steps);
    run_due_steps(battle)
}

/// Brings in another party member. Invalid picks keep the switch screen open.
pub fn switch_to(battle: &mut BattleState, index: usize) -> DispatchResult<Effect> {
    if battle.phase != BattlePhase::Switch {
        return DispatchResult::unchanged();
    }
    if let Err(error) = battle.player.check_switch(index) {
        battle.current_dialog = error.to_string();
        return DispatchResult::changed();
    }
    finish_idle_resets(battle);
    battle.phase = BattlePhase::AttackAnimation;
    battle.forced_switch = false;
    battle.current_dialog = format!("Come back, {}!", battle.display_name(Side::Player));
    battle.player_anim = CreatureAnim::Recall;
    battle.timeline.push(RECALL_MS, TurnStep::SendOut { index });
    battle.timeline.push(SEND_OUT_MS, TurnStep::Idle(Side::Player));
    battle.timeline.push(0, TurnStep::Settle);
    DispatchResult::changed()
}

pub fn throw_ball(battle: &mut BattleState) -> DispatchResult<Effect> {
    if battle.phase != BattlePhase::Bag || battle.enemy.active_fainted() {
        return DispatchResult::unchanged();
    }
    finish_idle_resets(battle);
    battle.phase = BattlePhase::AttackAnimation;
    battle.current_dialog = "Go! Poké Ball!".to_string();
    battle.timeline.push(CATCH_SHAKE_MS, TurnStep::CatchShake);
    battle.timeline.push(CATCH_RESOLVE_MS, TurnStep::CatchResolve);
    DispatchResult::changed()
}

/// Applies animation resets still waiting from a send-out so a new sequence
/// starts on an empty timeline.
fn finish_idle_resets(battle: &mut BattleState) {
    while let Some(step) = battle
        .timeline
        .take_front_if(|step| matches!(step, TurnStep::Idle(_)))
    {
        run_step(battle, step, &mut Vec::new());
    }
}

/// Advances the clock by `dt_ms` and runs whatever became due.
pub fn tick(battle: &mut BattleState, dt_ms: u32) -> DispatchResult<Effect> {
    battle.timeline.advance(dt_ms);
    let result = run_due_steps(battle);
    if !result.changed && battle.cutscene.is_some() {
        return DispatchResult::changed();
    }
    result
}

pub fn mega_form_loaded(
    battle: &mut BattleState,
    side: Side,
    form: MegaForm,
) -> DispatchResult<Effect> {
    if battle.mega_fetch != MegaFetch::InFlight(side) {
        return DispatchResult::unchanged();
    }
    battle.mega_fetch = MegaFetch::Ready(side, form);
    let result = run_due_steps(battle);
    if result.changed {
        return result;
    }
    DispatchResult::changed()
}

pub fn mega_form_failed(battle: &mut BattleState, side: Side) -> DispatchResult<Effect> {
    if battle.mega_fetch != MegaFetch::InFlight(side) {
        return DispatchResult::unchanged();
    }
    battle.mega_fetch = MegaFetch::Failed(side);
    let result = run_due_steps(battle);
    if result.changed {
        return result;
    }
    DispatchResult::changed()
}

fn run_due_steps(battle: &mut BattleState) -> DispatchResult<Effect> {
    let mut changed = false;
    let mut effects = Vec::new();
    while let Some(step) = battle.timeline.pop_due() {
        let flow = run_step(battle, step, &mut effects);
        if matches!(flow, Flow::Blocked) {
            break;
        }
        changed = true;
    }
    match (changed, effects.is_empty()) {
        (_, false) => DispatchResult::changed_with_many(effects),
        (true, true) => DispatchResult::changed(),
        (false, true) => DispatchResult::unchanged(),
    }
}

fn run_step(battle: &mut BattleState, step: TurnStep, effects: &mut Vec<Effect>) -> Flow {
    match step {
        TurnStep::MegaActivate(side) => mega_activate(battle, side, effects),
        TurnStep::MegaEncase(side) => {
            if let Some(cutscene) = battle.cutscene.as_mut() {
                if cutscene.side == side {
                    cutscene.stage = CutsceneStage::Encasement;
                }
            }
        }
        TurnStep::MegaBurst(side) => return mega_burst(battle, side),
        TurnStep::MegaFinish(side) => {
            battle.cutscene = None;
            battle.mega_fetch = MegaFetch::Idle;
            battle.set_anim(side, CreatureAnim::Idle);
        }
        TurnStep::EnemyMegaRoll => {
            let capable = battle
                .enemy
                .active()
                .map(|creature| creature.can_mega_evolve())
                .unwrap_or(false);
            if capable && battle.rng.chance(battle.enemy_mega_chance) {
                battle
                    .timeline
                    .push_front_all(mega_steps(Side::Enemy).to_vec());
            }
        }
        TurnStep::ChooseOrder { player_move } => choose_order(battle, player_move),
        TurnStep::Announce { side, move_index } => announce(battle, side, move_index),
        TurnStep::Strike { side, move_index } => strike(battle, side, move_index),
        TurnStep::Recover { side } => {
            let defender = side.opponent();
            if battle.anim(defender) == CreatureAnim::Hit {
                battle.set_anim(defender, CreatureAnim::Idle);
            }
            battle.active_move_type = None;
        }
        TurnStep::Idle(side) => {
            if battle.anim(side) != CreatureAnim::Fainted {
                battle.set_anim(side, CreatureAnim::Idle);
            }
        }
        TurnStep::SendOut { index } => {
            battle.player.active = index;
            battle.mega_pending = false;
            battle.player_anim = CreatureAnim::Release;
            battle.current_dialog = format!("Go! {}!", battle.display_name(Side::Player));
        }
        TurnStep::CatchShake => battle.enemy_anim = CreatureAnim::Capture,
        TurnStep::CatchResolve => catch_resolve(battle),
        TurnStep::Settle => {
            battle.phase = BattlePhase::TextProcessing;
            battle.active_move_type = None;
        }
    }
    Flow::Continue
}

fn mega_activate(battle: &mut BattleState, side: Side, effects: &mut Vec<Effect>) {
    let Some(creature) = battle.team(side).active() else {
        return;
    };
    let Some(mega_id) = creature.mega_id.filter(|_| creature.can_mega_evolve()) else {
        battle
            .timeline
            .skip_while(|step| is_mega_step(step, side));
        return;
    };
    let element = creature
        .types
        .first()
        .copied()
        .unwrap_or(ElementType::Normal);
    let name = creature.name.clone();
    battle.cutscene = Some(MegaCutscene {
        side,
        stage: CutsceneStage::Activation,
        element,
        name,
    });
    battle.current_dialog = "...!?".to_string();
    battle.mega_fetch = MegaFetch::InFlight(side);
    battle.set_anim(side, CreatureAnim::Mega);
    effects.push(Effect::LoadMegaForm { side, mega_id });
}

fn is_mega_step(step: &TurnStep, side: Side) -> bool {
    matches!(
        step,
        TurnStep::MegaEncase(s) | TurnStep::MegaBurst(s) | TurnStep::MegaFinish(s) if *s == side
    )
}

fn mega_burst(battle: &mut BattleState, side: Side) -> Flow {
    let fetch = std::mem::take(&mut battle.mega_fetch);
    let form = match fetch {
        MegaFetch::InFlight(pending) => {
            battle.mega_fetch = MegaFetch::InFlight(pending);
            battle.timeline.defer(TurnStep::MegaBurst(side));
            return Flow::Blocked;
        }
        MegaFetch::Ready(ready, form) if ready == side => Some(form),
        _ => None,
    };

    let before = battle.display_name(side);
    let Some(creature) = battle.team_mut(side).active_mut() else {
        return Flow::Continue;
    };
    let evolved = match form {
        Some(form) if !creature.is_mega => {
            creature.mega_evolve(form);
            Some(creature.name.clone())
        }
        _ => {
            creature.forfeit_mega();
            None
        }
    };
    match evolved {
        Some(evolved) => {
            log::info!("{} mega evolved into {evolved}", side.label());
            battle.current_dialog = format!("{before} evolved into {evolved}!");
            if let Some(cutscene) = battle.cutscene.as_mut() {
                cutscene.stage = CutsceneStage::Burst;
                cutscene.name = evolved;
            }
        }
        None => battle.current_dialog = "...but nothing happened.".to_string(),
    }
    Flow::Continue
}

fn choose_order(battle: &mut BattleState, player_move: usize) {
    let (Some(player), Some(enemy)) = (battle.player.active(), battle.enemy.active()) else {
        battle.timeline.push_front_all(vec![(0, TurnStep::Settle)]);
        return;
    };
    let player_speed = player.stats.speed;
    let enemy_speed = enemy.stats.speed;
    let enemy_moves = enemy.moves.len() as u32;
    let enemy_move = battle.rng.roll(enemy_moves) as usize;

    let (first, second) = if player_speed >= enemy_speed {
        ((Side::Player, player_move), (Side::Enemy, enemy_move))
    } else {
        ((Side::Enemy, enemy_move), (Side::Player, player_move))
    };
    let mut steps = Vec::with_capacity(7);
    steps.extend(attack_steps(first.0, first.1));
    steps.extend(attack_steps(second.0, second.1));
    steps.push((0, TurnStep::Settle));
    battle.timeline.push_front_all(steps);
}

fn announce(battle: &mut BattleState, side: Side, move_index: usize) {
    let attacker = battle.team(side).active();
    let Some(mv) = attacker
        .filter(|creature| !creature.is_fainted)
        .and_then(|creature| creature.moves.get(move_index))
    else {
        battle
            .timeline
            .skip_while(|step| step.attacker() == Some(side));
        return;
    };
    let element = mv.element;
    let line = format!("{} used {}!", battle.display_name(side), mv.name);
    battle.current_dialog = line;
    battle.active_move_type = Some(element);
    battle.set_anim(side, CreatureAnim::Attacking);
}

fn strike(battle: &mut BattleState, side: Side, move_index: usize) {
    let (attacking, defending) = match side {
        Side::Player => (&battle.player, &mut battle.enemy),
        Side::Enemy => (&battle.enemy, &mut battle.player),
    };
    let (Some(attacker), Some(defender)) = (attacking.active(), defending.active_mut()) else {
        return;
    };
    let Some(mv) = attacker.moves.get(move_index) else {
        return;
    };
    if defender.is_fainted {
        return;
    }
    let outcome = calc_damage(attacker, defender, mv, &mut battle.rng);
    let dealt = defender.apply_damage(outcome.damage);
    log::debug!(
        "{} hit {} with {} for {} (x{})",
        attacker.name,
        defender.name,
        mv.name,
        dealt,
        outcome.multiplier
    );
    let fainted = defender.is_fainted;

    battle.set_anim(side, CreatureAnim::Idle);
    let defender_side = side.opponent();
    let defender_name = battle.display_name(defender_side);
    if fainted {
        battle.set_anim(defender_side, CreatureAnim::Fainted);
        battle
            .dialog_queue
            .push_back(format!("{defender_name} fainted!"));
    } else {
        battle.set_anim(defender_side, CreatureAnim::Hit);
    }
    if let Some(message) = Effectiveness::classify(outcome.multiplier).message() {
        battle.current_dialog = message.to_string();
    }
}

fn catch_resolve(battle: &mut BattleState) {
    let Some(target) = battle.enemy.active_mut() else {
        battle.timeline.push_front_all(vec![(0, TurnStep::Settle)]);
        return;
    };
    if target.is_catchable() {
        target.mark_caught();
        let name = target.name.clone();
        log::info!("caught {name}");
        battle.current_dialog = format!("Gotcha! {name} was caught!");
        battle.timeline.push_front_all(vec![(0, TurnStep::Settle)]);
    } else {
        battle.current_dialog = "Oh no! The Pokémon broke free!".to_string();
        battle.enemy_anim = CreatureAnim::Idle;
        battle
            .timeline
            .push_front_all(vec![(CATCH_FAIL_MS, TurnStep::Settle)]);
    }
}
