use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{block::Title, Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{DataResource, EventKind, EventOutcome, RenderContext};
use tui_dispatch_components::centered_rect;

use crate::action::Action;
use crate::creature::{Creature, Side};
use crate::state::{
    AppState, BattlePhase, BattleState, CreatureAnim, CutsceneStage, MegaCutscene, MenuOption,
};
use crate::types::ElementType;

const BG_BASE: Color = Color::Rgb(24, 36, 26);
const BG_PANEL: Color = Color::Rgb(34, 58, 38);
const BG_PANEL_ALT: Color = Color::Rgb(28, 48, 32);
const BG_OVERLAY: Color = Color::Rgb(16, 18, 28);
const TEXT_MAIN: Color = Color::Rgb(228, 236, 214);
const TEXT_DIM: Color = Color::Rgb(172, 186, 160);
const ACCENT_GREEN: Color = Color::Rgb(104, 204, 120);
const ACCENT_GOLD: Color = Color::Rgb(222, 196, 120);
const ACCENT_RED: Color = Color::Rgb(220, 96, 96);
const HIGHLIGHT_BG: Color = ACCENT_GREEN;
const HIGHLIGHT_TEXT: Color = Color::Rgb(16, 26, 18);
const BORDER_ACCENT: Color = Color::Rgb(74, 98, 82);

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    draw(frame, area, state);
}

/// Draws the whole screen for `state`.
pub fn draw(frame: &mut Frame, area: Rect, state: &AppState) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);
    match &state.battle {
        DataResource::Loaded(battle) => {
            render_battle(frame, area, battle);
            if let Some(cutscene) = battle.cutscene.as_ref() {
                render_cutscene(frame, area, cutscene, state.tick);
            }
        }
        _ => render_placeholder(frame, area, state),
    }
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
        return EventOutcome::action(Action::Quit);
    }
    let Some(battle) = state.battle() else {
        return EventOutcome::ignored();
    };
    if battle.is_busy() || battle.phase.is_over() {
        return EventOutcome::ignored();
    }

    let action = match key.code {
        KeyCode::Enter | KeyCode::Char('z') | KeyCode::Char('Z') => Some(Action::BattleConfirm),
        KeyCode::Esc | KeyCode::Char('x') | KeyCode::Char('X') => Some(Action::BattleBack),
        KeyCode::Up | KeyCode::Left | KeyCode::Char('w') | KeyCode::Char('a') => {
            Some(Action::BattleCursorPrev)
        }
        KeyCode::Down | KeyCode::Right | KeyCode::Char('s') | KeyCode::Char('d') => {
            Some(Action::BattleCursorNext)
        }
        KeyCode::Char('m') | KeyCode::Char('M') => Some(Action::BattleMegaToggle),
        _ => None,
    };
    EventOutcome::from(action)
}

fn render_placeholder(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" MEGABATTLE ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let spinner = SPINNER[(state.tick as usize / 2) % SPINNER.len()];
    let lines = vec![
        Line::from(" "),
        Line::from(Span::styled(
            format!("LOADING BATTLE... {spinner}"),
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        )),
        Line::from(" "),
        Line::from(Span::styled("Q: Quit", Style::default().fg(TEXT_DIM))),
    ];

    let paragraph = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_battle(frame: &mut Frame, area: Rect, battle: &BattleState) {
    // Command box is fixed at bottom, creature panels split the rest
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(9)])
        .split(area);
    let panels = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(layout[0]);

    render_creature_panel(frame, panels[0], battle, Side::Enemy);
    render_creature_panel(frame, panels[1], battle, Side::Player);
    render_command_box(frame, layout[1], battle);
}

fn render_creature_panel(frame: &mut Frame, area: Rect, battle: &BattleState, side: Side) {
    let team = battle.team(side);
    let title = match (side, team.active()) {
        (Side::Enemy, Some(creature)) => format!(
            " TRAINER {} · {} ",
            battle.opponent.to_uppercase(),
            creature.name.to_uppercase()
        ),
        (Side::Player, Some(creature)) => format!(" {} ", creature.name.to_uppercase()),
        (_, None) => " --- ".to_string(),
    };
    let block = panel_block(title, BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(creature) = team.active() else {
        return;
    };
    // Stats on the outer edge, sprite towards the middle
    let constraints = match side {
        Side::Enemy => [Constraint::Length(30), Constraint::Min(10)],
        Side::Player => [Constraint::Min(10), Constraint::Length(30)],
    };
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(inner);
    let (stats_area, sprite_area) = match side {
        Side::Enemy => (layout[0], layout[1]),
        Side::Player => (layout[1], layout[0]),
    };
    render_stats(frame, stats_area, creature, team.members.as_slice());
    render_sprite(frame, sprite_area, creature, battle.anim(side), battle.active_move_type);
}

fn render_stats(frame: &mut Frame, area: Rect, creature: &Creature, party: &[Creature]) {
    let mut type_spans = Vec::new();
    for element in &creature.types {
        type_spans.push(Span::styled(
            format!(" {} ", element.label()),
            Style::default()
                .fg(HIGHLIGHT_TEXT)
                .bg(element_color(*element))
                .add_modifier(Modifier::BOLD),
        ));
        type_spans.push(Span::raw(" "));
    }
    if creature.is_mega {
        type_spans.push(Span::styled(
            "MEGA",
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        ));
    } else if creature.can_mega_evolve() {
        type_spans.push(Span::styled("◆", Style::default().fg(ACCENT_GOLD)));
    }

    let mut lines = vec![
        Line::from(type_spans),
        hp_line(creature),
        party_line(party),
    ];
    if creature.caught {
        lines.push(Line::from(Span::styled(
            "CAUGHT",
            Style::default().fg(ACCENT_GOLD),
        )));
    }
    let paragraph = Paragraph::new(Text::from(lines)).style(Style::default().fg(TEXT_MAIN));
    frame.render_widget(paragraph, area);
}

fn render_sprite(
    frame: &mut Frame,
    area: Rect,
    creature: &Creature,
    anim: CreatureAnim,
    move_type: Option<ElementType>,
) {
    let (glyph, color) = match anim {
        CreatureAnim::Idle => ("( o_o )", TEXT_MAIN),
        CreatureAnim::Attacking => (
            "( >_< )≫",
            move_type.map(element_color).unwrap_or(TEXT_MAIN),
        ),
        CreatureAnim::Hit => ("( x_x )", ACCENT_RED),
        CreatureAnim::Fainted => ("(  _  )", TEXT_DIM),
        CreatureAnim::Mega => ("<( O_O )>", ACCENT_GOLD),
        CreatureAnim::Recall => ("  ( · )  ", TEXT_DIM),
        CreatureAnim::Release => ("*( o_o )*", ACCENT_GREEN),
        CreatureAnim::Capture => ("  (◓)  ", ACCENT_RED),
    };
    let lines = vec![
        Line::from(" "),
        Line::from(Span::styled(
            glyph,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("#{:03}", creature.id),
            Style::default().fg(TEXT_DIM),
        )),
    ];
    let paragraph = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_command_box(frame: &mut Frame, area: Rect, battle: &BattleState) {
    let block = panel_block(format!(" TURN {} ", battle.turn), BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![Line::from(battle.current_dialog.clone())];
    match battle.phase {
        BattlePhase::Start | BattlePhase::TextProcessing => {
            lines.push(hint_line("Z/Enter: Continue"));
        }
        BattlePhase::Menu => {
            lines.push(Line::from(" "));
            lines.push(battle_menu_line(battle.menu_index));
            lines.push(hint_line("Z/Enter: Select"));
        }
        BattlePhase::MoveSelection => {
            lines.extend(move_lines(battle));
            let mega = battle
                .active_player()
                .map(|creature| creature.can_mega_evolve())
                .unwrap_or(false);
            let hint = match (mega, battle.mega_pending) {
                (true, true) => "Z/Enter: Attack  |  M: Mega [ON]  |  Esc: Back",
                (true, false) => "Z/Enter: Attack  |  M: Mega [off]  |  Esc: Back",
                (false, _) => "Z/Enter: Attack  |  Esc: Back",
            };
            lines.push(hint_line(hint));
        }
        BattlePhase::Switch => {
            lines.extend(switch_lines(battle));
            lines.push(hint_line(if battle.forced_switch {
                "Z/Enter: Send out"
            } else {
                "Z/Enter: Send out  |  Esc: Back"
            }));
        }
        BattlePhase::Bag => {
            lines.push(menu_line("POKé BALL", true));
            lines.push(hint_line("Z/Enter: Throw  |  Esc: Back"));
        }
        BattlePhase::AttackAnimation => {}
        BattlePhase::Victory | BattlePhase::Defeat => {
            lines.push(hint_line("Q: Quit"));
        }
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .style(Style::default().fg(TEXT_MAIN))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

fn render_cutscene(frame: &mut Frame, area: Rect, cutscene: &MegaCutscene, tick: u64) {
    let modal = centered_rect(46, 7, area);
    frame.render_widget(Clear, modal);
    let color = element_color(cutscene.element);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .style(Style::default().bg(BG_OVERLAY).fg(TEXT_MAIN))
        .border_style(Style::default().fg(color));
    let inner = block.inner(modal);
    frame.render_widget(block, modal);

    let pulse = if tick % 2 == 0 { "◇" } else { "◆" };
    let (banner, detail) = match cutscene.stage {
        CutsceneStage::Activation => (format!("{pulse} KEY STONE {pulse}"), "...!?".to_string()),
        CutsceneStage::Encasement => (
            format!("{pulse}{pulse} {} {pulse}{pulse}", cutscene.name.to_uppercase()),
            "is enveloped in light!".to_string(),
        ),
        CutsceneStage::Burst => (
            "✦ MEGA EVOLUTION ✦".to_string(),
            cutscene.name.to_uppercase(),
        ),
    };
    let lines = vec![
        Line::from(" "),
        Line::from(Span::styled(
            banner,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(detail, Style::default().fg(ACCENT_GOLD))),
    ];
    let paragraph = Paragraph::new(Text::from(lines)).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn move_lines(battle: &BattleState) -> Vec<Line<'static>> {
    let Some(creature) = battle.active_player() else {
        return Vec::new();
    };
    creature
        .moves
        .iter()
        .enumerate()
        .map(|(idx, mv)| {
            let label = format!(
                "{:<16} {:<8} PWR {:>3}  PP {}/{}",
                mv.name,
                mv.element.label(),
                mv.power,
                mv.pp,
                mv.max_pp
            );
            menu_line(&label, idx == battle.move_index)
        })
        .collect()
}

fn switch_lines(battle: &BattleState) -> Vec<Line<'static>> {
    battle
        .player
        .members
        .iter()
        .enumerate()
        .map(|(idx, creature)| {
            let status = if creature.is_fainted {
                "FNT".to_string()
            } else if idx == battle.player.active {
                "IN BATTLE".to_string()
            } else {
                format!("{}/{}", creature.current_hp, creature.max_hp)
            };
            let label = format!("{:<20} {status}", creature.name);
            menu_line(&label, idx == battle.switch_index)
        })
        .collect()
}

fn battle_menu_line(selected: usize) -> Line<'static> {
    let mut spans = Vec::new();
    for (idx, option) in MenuOption::ALL.iter().enumerate() {
        let style = if idx == selected {
            Style::default()
                .fg(ACCENT_GREEN)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(TEXT_MAIN)
        };
        spans.push(Span::styled(option.label().to_string(), style));
        if idx + 1 < MenuOption::ALL.len() {
            spans.push(Span::raw("   "));
        }
    }
    Line::from(spans)
}

/// One ball per party slot, dimmed once fainted.
fn party_line(party: &[Creature]) -> Line<'static> {
    let spans: Vec<Span<'static>> = party
        .iter()
        .map(|creature| {
            if creature.is_fainted {
                Span::styled("○ ", Style::default().fg(TEXT_DIM))
            } else {
                Span::styled("● ", Style::default().fg(ACCENT_RED))
            }
        })
        .collect();
    Line::from(spans)
}

fn hp_line(creature: &Creature) -> Line<'static> {
    let width: usize = 12;
    let ratio = creature.hp_ratio();
    let filled = ((ratio * width as f32).round() as usize).min(width);
    let empty = width.saturating_sub(filled);
    let color = if ratio > 0.5 {
        ACCENT_GREEN
    } else if ratio > 0.2 {
        ACCENT_GOLD
    } else {
        ACCENT_RED
    };
    Line::from(vec![
        Span::raw("HP "),
        Span::styled(
            "█".repeat(filled),
            Style::default()
                .fg(color)
                .bg(Color::Rgb(24, 32, 24))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "░".repeat(empty),
            Style::default().fg(TEXT_DIM).bg(Color::Rgb(20, 26, 20)),
        ),
        Span::raw(format!(" {}/{}", creature.current_hp, creature.max_hp)),
    ])
}

fn hint_line(text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, Style::default().fg(TEXT_DIM)))
}

fn panel_block<'a, T>(title: T, bg: Color) -> Block<'a>
where
    T: Into<Title<'a>>,
{
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}

fn menu_line(label: &str, selected: bool) -> Line<'static> {
    let style = if selected {
        Style::default()
            .fg(HIGHLIGHT_TEXT)
            .bg(HIGHLIGHT_BG)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_MAIN)
    };
    Line::from(Span::styled(label.to_string(), style))
}

pub fn element_color(element: ElementType) -> Color {
    match element {
        ElementType::Normal => Color::Rgb(168, 168, 120),
        ElementType::Fire => Color::Rgb(240, 128, 48),
        ElementType::Water => Color::Rgb(104, 144, 240),
        ElementType::Electric => Color::Rgb(248, 208, 48),
        ElementType::Grass => Color::Rgb(120, 200, 80),
        ElementType::Ice => Color::Rgb(152, 216, 216),
        ElementType::Fighting => Color::Rgb(192, 48, 40),
        ElementType::Poison => Color::Rgb(160, 64, 160),
        ElementType::Ground => Color::Rgb(224, 192, 104),
        ElementType::Flying => Color::Rgb(168, 144, 240),
        ElementType::Psychic => Color::Rgb(248, 88, 136),
        ElementType::Bug => Color::Rgb(168, 184, 32),
        ElementType::Rock => Color::Rgb(184, 160, 56),
        ElementType::Ghost => Color::Rgb(112, 88, 152),
        ElementType::Dragon => Color::Rgb(112, 56, 248),
        ElementType::Dark => Color::Rgb(112, 88, 72),
        ElementType::Steel => Color::Rgb(184, 184, 208),
        ElementType::Fairy => Color::Rgb(238, 153, 172),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn test_busy_battle_ignores_keys_but_quit() {
        use crate::creature::tests::{creature, even_stats};
        use crate::creature::Team;
        use crate::rng::BattleRng;
        use crate::state::Rules;

        let mut state = AppState::new(Rules::default(), BattleRng::new(1));
        let mut battle = BattleState::new(
            Team::new(vec![creature(6, "Charizard", even_stats(78))]),
            Team::new(vec![creature(9, "Blastoise", even_stats(79))]),
            BattleRng::new(1),
            &Rules::default(),
        );
        battle.phase = BattlePhase::AttackAnimation;
        state.battle = DataResource::Loaded(battle);

        let key = |code| EventKind::Key(KeyEvent::new(code, KeyModifiers::NONE));
        assert!(handle_event(&key(KeyCode::Enter), &state).actions.is_empty());
        let quit = handle_event(&key(KeyCode::Char('q')), &state);
        assert!(matches!(quit.actions.first(), Some(Action::Quit)));
    }

    #[test]
    fn test_hp_line_shows_numbers() {
        use crate::creature::tests::{creature, even_stats};

        let mut mon = creature(1, "Bulbasaur", even_stats(45));
        assert_eq!(mon.max_hp, 200);
        mon.current_hp = 50;
        let line = hp_line(&mon);
        let text: String = line.spans.iter().map(|span| span.content.as_ref()).collect();
        assert!(text.ends_with(" 50/200"));
        assert_eq!(text.matches('█').count(), 3);
    }
}
