use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::LevelFilter;
use ratatui::{backend::CrosstermBackend, Terminal};
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use megabattle::action::Action;
use megabattle::api;
use megabattle::config::BattleConfig;
use megabattle::effect::Effect;
use megabattle::logging;
use megabattle::reducer::reducer;
use megabattle::rng::BattleRng;
use megabattle::state::AppState;
use megabattle::timeline::TICK_MS;
use megabattle::ui;

#[derive(Parser, Debug)]
#[command(name = "megabattle")]
#[command(about = "Trainer battle with mega evolution, in the terminal")]
struct Args {
    /// RON settings file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Seed for rosters, move pools and every battle roll
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the log (defaults to the user cache dir)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    #[command(flatten)]
    debug: DebugCliArgs,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    let log_path = args.log_file.clone().unwrap_or_else(logging::default_log_path);
    logging::init(&log_path, args.log_level)?;

    let config = BattleConfig::load(args.config.as_deref()).map_err(io::Error::other)?;
    log::info!("starting with {config:?}");
    api::configure(config.api());

    let rng = args.seed.map(BattleRng::new).unwrap_or_default();
    let rules = config.rules();
    let debug = DebugSession::new(args.debug);

    let state = debug
        .load_state_or_else_async(|| {
            let rules = rules.clone();
            async move { Ok::<AppState, io::Error>(AppState::new(rules, rng)) }
        })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime.subscriptions().interval(
                    "tick",
                    Duration::from_millis(u64::from(TICK_MS)),
                    || Action::Tick,
                );
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            handle_effect,
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>) {
    match effect {
        Effect::LoadTeams {
            player,
            enemy,
            move_seed,
        } => {
            ctx.tasks().spawn(TaskKey::new("teams"), async move {
                let (player, enemy) = tokio::join!(
                    api::fetch_team(player, move_seed),
                    api::fetch_team(enemy, move_seed.rotate_left(17)),
                );
                match (player, enemy) {
                    (Ok(player), Ok(enemy)) => Action::TeamsDidLoad { player, enemy },
                    (Err(error), _) | (_, Err(error)) => Action::TeamsDidError(error.to_string()),
                }
            });
        }
        Effect::LoadMegaForm { side, mega_id } => {
            let key = format!("mega_{}", side.label());
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::fetch_mega_form(mega_id).await {
                    Ok(form) => Action::MegaFormDidLoad { side, form },
                    Err(error) => Action::MegaFormDidError {
                        side,
                        error: error.to_string(),
                    },
                }
            });
        }
    }
}
