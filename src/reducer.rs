use tui_dispatch::{DataResource, DispatchResult};

use crate::action::Action;
use crate::battle;
use crate::creature::{Creature, Team};
use crate::effect::Effect;
use crate::roster::RosterKind;
use crate::state::{AppState, BattleState};
use crate::timeline::TICK_MS;

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => start_loading(state),
        Action::UiTerminalResize(width, height) => {
            if state.terminal_size != (width, height) {
                state.terminal_size = (width, height);
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }
        Action::Tick => {
            state.tick = state.tick.wrapping_add(1);
            // A failed load keeps spinning like a pending one.
            let loading = state.battle.is_loading() || state.battle.is_failed();
            match state.battle_mut() {
                Some(battle) => battle::tick(battle, TICK_MS),
                None if loading => DispatchResult::changed(),
                None => DispatchResult::unchanged(),
            }
        }

        Action::TeamsDidLoad { player, enemy } => teams_loaded(state, player, enemy),
        Action::TeamsDidError(error) => {
            log::error!("failed to load teams: {error}");
            state.battle = DataResource::Failed(error);
            DispatchResult::changed()
        }

        Action::MegaFormDidLoad { side, form } => with_battle(state, |battle| {
            battle::mega_form_loaded(battle, side, form)
        }),
        Action::MegaFormDidError { side, error } => {
            log::warn!("mega form for {} failed to load: {error}", side.label());
            with_battle(state, |battle| battle::mega_form_failed(battle, side))
        }

        Action::BattleCursorNext => with_battle(state, |battle| battle::move_cursor(battle, 1)),
        Action::BattleCursorPrev => with_battle(state, |battle| battle::move_cursor(battle, -1)),
        Action::BattleConfirm => with_battle(state, battle::confirm),
        Action::BattleBack => with_battle(state, battle::back),
        Action::BattleMegaToggle => with_battle(state, battle::toggle_mega),

        Action::DialogAdvance => with_battle(state, battle::advance_dialog),
        Action::ExecuteTurn(index) => {
            with_battle(state, |battle| battle::execute_turn(battle, index))
        }
        Action::SwitchTo(index) => with_battle(state, |battle| battle::switch_to(battle, index)),
        Action::ThrowBall => with_battle(state, battle::throw_ball),

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn with_battle(
    state: &mut AppState,
    f: impl FnOnce(&mut BattleState) -> DispatchResult<Effect>,
) -> DispatchResult<Effect> {
    match state.battle_mut() {
        Some(battle) => f(battle),
        None => DispatchResult::unchanged(),
    }
}

fn start_loading(state: &mut AppState) -> DispatchResult<Effect> {
    let player = RosterKind::MegaCapable.pick(state.rules.team_size, &mut state.rng);
    let enemy = state
        .rules
        .enemy_roster
        .pick(state.rules.team_size, &mut state.rng);
    let move_seed = state.rng.next_u64();
    log::info!("loading teams: player {player:?} vs enemy {enemy:?}");
    state.battle = DataResource::Loading;
    DispatchResult::changed_with(Effect::LoadTeams {
        player,
        enemy,
        move_seed,
    })
}

fn teams_loaded(
    state: &mut AppState,
    player: Vec<Creature>,
    enemy: Vec<Creature>,
) -> DispatchResult<Effect> {
    if player.is_empty() || enemy.is_empty() {
        state.battle = DataResource::Failed("a team came back empty".to_string());
        return DispatchResult::changed();
    }
    log::info!("battle ready: {} vs {} creatures", player.len(), enemy.len());
    let rng = state.rng.fork();
    state.battle = DataResource::Loaded(BattleState::new(
        Team::new(player),
        Team::new(enemy),
        rng,
        &state.rules,
    ));
    DispatchResult::changed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::tests::{creature, even_stats};
    use crate::rng::BattleRng;
    use crate::state::{BattlePhase, Rules};

    #[test]
    fn test_init_requests_both_rosters() {
        let mut state = AppState::new(Rules::default(), BattleRng::new(3));
        let result = reducer(&mut state, Action::Init);

        assert!(result.changed);
        assert!(state.battle.is_loading());
        match result.effects.as_slice() {
            [Effect::LoadTeams { player, enemy, .. }] => {
                assert_eq!(player.len(), 6);
                assert_eq!(enemy.len(), 6);
            }
            other => panic!("unexpected effects {other:?}"),
        }
    }

    #[test]
    fn test_failed_load_keeps_ticking_placeholder() {
        let mut state = AppState::new(Rules::default(), BattleRng::new(3));
        reducer(&mut state, Action::Init);
        reducer(&mut state, Action::TeamsDidError("timed out".into()));

        assert!(state.battle.is_failed());
        assert!(reducer(&mut state, Action::Tick).changed);
        assert!(!reducer(&mut state, Action::BattleConfirm).changed);
    }

    #[test]
    fn test_empty_team_fails_load() {
        let mut state = AppState::new(Rules::default(), BattleRng::new(3));
        reducer(&mut state, Action::Init);
        reducer(
            &mut state,
            Action::TeamsDidLoad {
                player: vec![creature(6, "Charizard", even_stats(78))],
                enemy: Vec::new(),
            },
        );
        assert!(state.battle.is_failed());
    }

    #[test]
    fn test_battle_actions_ignored_until_loaded() {
        let mut state = AppState::new(Rules::default(), BattleRng::new(3));
        assert!(!reducer(&mut state, Action::BattleConfirm).changed);
        assert!(!reducer(&mut state, Action::ThrowBall).changed);

        reducer(&mut state, Action::Init);
        reducer(
            &mut state,
            Action::TeamsDidLoad {
                player: vec![creature(6, "Charizard", even_stats(78))],
                enemy: vec![creature(150, "Mewtwo", even_stats(100))],
            },
        );
        assert_eq!(state.battle().map(|b| b.phase), Some(BattlePhase::Start));
        assert!(reducer(&mut state, Action::BattleConfirm).changed);
    }
}
