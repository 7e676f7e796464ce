//! Battle flows driven through the store, with async completions simulated.

use megabattle::{
    action::Action,
    creature::{BaseStats, Creature, MegaForm, Move, Side, Team},
    effect::Effect,
    reducer::reducer,
    rng::BattleRng,
    state::{AppState, BattlePhase, BattleState, Rules},
    types::ElementType,
    ui,
};
use tui_dispatch::testing::*;
use tui_dispatch::{DataResource, EffectStore, NumericComponentId};

fn stats(value: u16, speed: u16) -> BaseStats {
    BaseStats {
        hp: value,
        attack: value,
        defense: value,
        sp_attack: value,
        sp_defense: value,
        speed,
    }
}

fn mon(id: u32, name: &str, element: ElementType, speed: u16) -> Creature {
    Creature::new(
        id,
        name.to_string(),
        vec![element],
        stats(80, speed),
        vec![Move::tackle()],
    )
}

fn rules() -> Rules {
    Rules {
        enemy_mega_chance: 0,
        ..Rules::default()
    }
}

fn loaded_state(player: Vec<Creature>, enemy: Vec<Creature>) -> AppState {
    let mut state = AppState::new(rules(), BattleRng::new(7));
    state.battle = DataResource::Loaded(BattleState::new(
        Team::new(player),
        Team::new(enemy),
        BattleRng::new(7),
        &rules(),
    ));
    state
}

fn phase(state: &AppState) -> Option<BattlePhase> {
    state.battle().map(|battle| battle.phase)
}

macro_rules! tick_until_settled {
    ($store:expr) => {
        for _ in 0..200 {
            if phase($store.state()) != Some(BattlePhase::AttackAnimation) {
                break;
            }
            $store.dispatch(Action::Tick);
        }
    };
}

#[test]
fn test_team_load_flow_with_harness() {
    let mut harness = EffectStoreTestHarness::new(AppState::new(rules(), BattleRng::new(1)), reducer);

    harness.dispatch_collect(Action::Init);
    harness.assert_state(|s| s.battle.is_loading());

    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| matches!(e, Effect::LoadTeams { .. }));

    harness.complete_action(Action::TeamsDidLoad {
        player: vec![mon(6, "Charizard", ElementType::Fire, 100)],
        enemy: vec![mon(9, "Blastoise", ElementType::Water, 78)],
    });
    let (changed, total) = harness.process_emitted();
    assert_eq!(total, 1);
    assert_eq!(changed, 1);

    harness.assert_state(|s| s.battle.is_loaded());
    harness.assert_state(|s| phase(s) == Some(BattlePhase::Start));
}

#[test]
fn test_team_load_error_keeps_placeholder() {
    let mut harness = EffectStoreTestHarness::new(AppState::new(rules(), BattleRng::new(1)), reducer);

    harness.dispatch_collect(Action::Init);
    harness.complete_action(Action::TeamsDidError("pokeapi unreachable".into()));
    harness.process_emitted();

    harness.assert_state(|s| s.battle.is_failed());
    harness.assert_state(|s| s.battle.error() == Some("pokeapi unreachable"));
    harness.assert_state(|s| s.battle().is_none());
}

#[test]
fn test_turn_path_through_phases() {
    let state = loaded_state(
        vec![mon(6, "Charizard", ElementType::Fire, 100)],
        vec![mon(9, "Blastoise", ElementType::Water, 78)],
    );
    let mut store = EffectStore::new(state, reducer);

    // Three intro lines, then the menu.
    for _ in 0..3 {
        store.dispatch(Action::BattleConfirm);
        assert_eq!(phase(store.state()), Some(BattlePhase::TextProcessing));
    }
    store.dispatch(Action::BattleConfirm);
    assert_eq!(phase(store.state()), Some(BattlePhase::Menu));

    store.dispatch(Action::BattleConfirm);
    assert_eq!(phase(store.state()), Some(BattlePhase::MoveSelection));

    let result = store.dispatch(Action::BattleConfirm);
    assert!(result.changed);
    assert_eq!(phase(store.state()), Some(BattlePhase::AttackAnimation));

    tick_until_settled!(store);
    assert_eq!(phase(store.state()), Some(BattlePhase::TextProcessing));

    store.dispatch(Action::DialogAdvance);
    assert_eq!(phase(store.state()), Some(BattlePhase::Menu));
    assert_eq!(store.state().battle().map(|b| b.turn), Some(1));
}

#[test]
fn test_knockout_reaches_victory_once() {
    let mut enemy = mon(9, "Blastoise", ElementType::Water, 10);
    enemy.current_hp = 1;
    let mut state = loaded_state(vec![mon(6, "Charizard", ElementType::Fire, 100)], vec![enemy]);
    if let Some(battle) = state.battle_mut() {
        battle.dialog_queue.clear();
        battle.phase = BattlePhase::MoveSelection;
    }
    let mut store = EffectStore::new(state, reducer);

    store.dispatch(Action::ExecuteTurn(0));
    tick_until_settled!(store);

    store.dispatch(Action::DialogAdvance);
    assert_eq!(
        store.state().battle().map(|b| b.current_dialog.clone()),
        Some("The opposing Blastoise fainted!".to_string())
    );
    store.dispatch(Action::DialogAdvance);
    assert_eq!(phase(store.state()), Some(BattlePhase::Victory));

    for action in [Action::DialogAdvance, Action::BattleConfirm, Action::ExecuteTurn(0)] {
        assert!(!store.dispatch(action).changed);
    }
    assert_eq!(phase(store.state()), Some(BattlePhase::Victory));
}

#[test]
fn test_mega_flow_waits_for_form() {
    let player = mon(6, "Charizard", ElementType::Fire, 100).with_mega(Some(10034));
    let mut state = loaded_state(vec![player], vec![mon(9, "Blastoise", ElementType::Water, 78)]);
    if let Some(battle) = state.battle_mut() {
        battle.dialog_queue.clear();
        battle.phase = BattlePhase::MoveSelection;
    }
    let mut harness = EffectStoreTestHarness::new(state, reducer);

    harness.dispatch_collect(Action::BattleMegaToggle);
    harness.assert_state(|s| s.battle().map(|b| b.mega_pending) == Some(true));
    harness.dispatch_collect(Action::BattleConfirm);

    let effects = harness.drain_effects();
    effects.effects_count(1);
    effects.effects_first_matches(|e| {
        matches!(
            e,
            Effect::LoadMegaForm {
                side: Side::Player,
                mega_id: 10034
            }
        )
    });

    // Past the burst mark: the sequence holds until the form arrives.
    for _ in 0..40 {
        harness.dispatch_collect(Action::Tick);
    }
    harness.assert_state(|s| s.battle().and_then(|b| b.active_player()).map(|c| c.is_mega) == Some(false));
    harness.assert_state(|s| phase(s) == Some(BattlePhase::AttackAnimation));

    harness.complete_action(Action::MegaFormDidLoad {
        side: Side::Player,
        form: MegaForm {
            id: 10034,
            types: vec![ElementType::Fire, ElementType::Dragon],
            stats: stats(110, 100),
        },
    });
    harness.process_emitted();

    harness.assert_state(|s| {
        s.battle()
            .and_then(|b| b.active_player())
            .map(|c| c.is_mega && c.name == "Mega Charizard")
            == Some(true)
    });
    harness.assert_state(|s| {
        s.battle().map(|b| b.current_dialog.as_str()) == Some("Charizard evolved into Mega Charizard!")
    });
}

#[test]
fn test_mega_fetch_error_forfeits() {
    let player = mon(6, "Charizard", ElementType::Fire, 100).with_mega(Some(10034));
    let mut state = loaded_state(vec![player], vec![mon(9, "Blastoise", ElementType::Water, 78)]);
    if let Some(battle) = state.battle_mut() {
        battle.dialog_queue.clear();
        battle.phase = BattlePhase::MoveSelection;
        battle.mega_pending = true;
    }
    let mut store = EffectStore::new(state, reducer);

    store.dispatch(Action::ExecuteTurn(0));
    store.dispatch(Action::MegaFormDidError {
        side: Side::Player,
        error: "timed out".into(),
    });
    // Failure recorded before the burst; the burst reports it when due.
    tick_until_settled!(store);

    let battle = store.state().battle().cloned();
    let creature = battle.as_ref().and_then(|b| b.active_player().cloned());
    assert!(creature.as_ref().map(|c| !c.is_mega && c.mega_id.is_none()) == Some(true));
    assert_eq!(battle.map(|b| b.phase), Some(BattlePhase::TextProcessing));
}

#[test]
fn test_keys_map_to_battle_actions() {
    let mut state = loaded_state(
        vec![mon(6, "Charizard", ElementType::Fire, 100)],
        vec![mon(9, "Blastoise", ElementType::Water, 78)],
    );
    if let Some(battle) = state.battle_mut() {
        battle.phase = BattlePhase::Menu;
    }
    let mut harness = EffectStoreTestHarness::new(state, reducer);

    let actions = harness.send_keys::<NumericComponentId, _, _>("z m q", |state, event| {
        ui::handle_event(&event.kind, state)
            .actions
            .into_iter()
            .collect::<Vec<_>>()
    });
    actions.assert_count(3);
    actions.assert_first(Action::BattleConfirm);
}
