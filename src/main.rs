mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::{Duration, SystemTime},
};

use mathdash::{
    celebration::Celebration,
    config::{Config, ConfigStore, FileConfigStore},
    game::{EndReason, Game, GameSettings, Phase},
    problem::Operation,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    scores::{ScoreStore, SqliteScoreStore},
    session_store::{FileSessionStore, SessionSnapshot, SessionStore},
};

const TICK_RATE_MS: u64 = 100;

/// fast mental math drills in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Timed arithmetic drills with focus-number practice, learner hints, a typing warmup that separates math speed from typing speed, and a local score history.",
    allow_negative_numbers = true
)]
pub struct Cli {
    /// operation to drill
    #[clap(short = 'o', long, value_enum)]
    operation: Option<Operation>,

    /// lower bound for the first operand (for division: the quotient)
    #[clap(long)]
    min1: Option<i64>,

    /// upper bound for the first operand (for division: the quotient)
    #[clap(long)]
    max1: Option<i64>,

    /// lower bound for the second operand
    #[clap(long)]
    min2: Option<i64>,

    /// upper bound for the second operand
    #[clap(long)]
    max2: Option<i64>,

    /// number of seconds in a round
    #[clap(short = 's', long)]
    seconds: Option<u64>,

    /// allow negative subtraction answers (type '-' to flip the sign)
    #[clap(long)]
    negatives: bool,

    /// pin one operand (or the division quotient) to this number
    #[clap(short = 'f', long)]
    focus: Option<i64>,

    /// reveal the answer after six idle seconds, then let you type it
    #[clap(long)]
    learner: bool,

    /// show the on-screen number pad
    #[clap(long)]
    number_pad: bool,

    /// run a typing warmup first and report typing-adjusted math speed
    #[clap(long)]
    typing_adjust: bool,

    /// discard any saved in-progress round instead of resuming it
    #[clap(long)]
    fresh: bool,
}

impl Cli {
    /// Overlay CLI flags on the stored config. Flags win; absent flags keep
    /// whatever the last run used.
    fn to_settings(&self, base: &Config) -> Result<GameSettings, String> {
        let mut settings = base.to_settings();

        if let Some(operation) = self.operation {
            settings.operation = operation;
        }
        if let Some(min1) = self.min1 {
            settings.range.min1 = min1;
        }
        if let Some(max1) = self.max1 {
            settings.range.max1 = max1;
        }
        if let Some(min2) = self.min2 {
            settings.range.min2 = min2;
        }
        if let Some(max2) = self.max2 {
            settings.range.max2 = max2;
        }
        if let Some(seconds) = self.seconds {
            settings.timer_secs = seconds;
        }
        if self.negatives {
            settings.allow_negatives = true;
        }
        if let Some(focus) = self.focus {
            settings.focus_number = Some(focus);
        }
        if self.learner {
            settings.learner_mode = true;
        }
        if self.number_pad {
            settings.custom_number_pad = true;
        }
        if self.typing_adjust {
            settings.typing_speed_adjustment = true;
        }

        if !settings.range.is_valid() {
            return Err(format!(
                "invalid range: {}-{} / {}-{} (max must be >= min)",
                settings.range.min1, settings.range.max1, settings.range.min2, settings.range.max2
            ));
        }
        if settings.operation == Operation::Division && settings.range.max2 < 1 {
            return Err("division needs a second-operand bound of at least 1".into());
        }
        if settings.timer_secs == 0 {
            return Err("round length must be at least 1 second".into());
        }

        Ok(settings)
    }
}

#[derive(Debug)]
pub struct App {
    pub game: Game,
    pub celebration: Celebration,
    pub focused: bool,
    pub now: SystemTime,
    session_store: FileSessionStore,
    last_saved_score: Option<u32>,
}

impl App {
    pub fn new(game: Game, session_store: FileSessionStore) -> Self {
        Self {
            game,
            celebration: Celebration::new(),
            focused: true,
            now: SystemTime::now(),
            session_store,
            last_saved_score: None,
        }
    }

    /// Keep the on-disk snapshot in step with the live round so a relaunch
    /// can resume it.
    fn persist_session(&mut self) {
        if self.game.phase != Phase::Playing {
            return;
        }
        let Some(started_at) = self.game.started_at() else {
            return;
        };
        if self.last_saved_score == Some(self.game.score) {
            return;
        }
        let snapshot = SessionSnapshot::new(
            self.game.settings,
            started_at,
            self.game.score,
            self.game.typing_speed,
        );
        let _ = self.session_store.save(&snapshot);
        self.last_saved_score = Some(self.game.score);
    }

    fn drop_session(&mut self) {
        let _ = self.session_store.clear();
        self.last_saved_score = None;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let settings = match cli.to_settings(&config_store.load()) {
        Ok(settings) => settings,
        Err(msg) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, msg).exit();
        }
    };
    let _ = config_store.save(&Config::from(&settings));

    let scores: Option<Box<dyn ScoreStore>> = match SqliteScoreStore::new() {
        Ok(store) => Some(Box::new(store)),
        Err(_) => None,
    };
    let mut game = Game::new(settings, scores);

    let session_store = FileSessionStore::new();
    if cli.fresh {
        let _ = session_store.clear();
    } else if let Some(snapshot) = session_store.load() {
        let now = SystemTime::now();
        if snapshot.is_live(now) {
            // Resume the interrupted round under its own settings; the
            // original start timestamp keeps the remaining time honest.
            game.settings = snapshot.settings;
            game.resume_round(snapshot.started_at(), snapshot.score, snapshot.typing_speed, now);
        } else {
            let _ = session_store.clear();
        }
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(game, session_store);
    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableFocusChange)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    app.persist_session();
    terminal.draw(|f| draw(app, f))?;

    loop {
        match runner.step() {
            AppEvent::Tick => {
                app.now = SystemTime::now();
                let before = app.game.phase;
                app.game.on_tick(app.now);
                app.celebration.update();
                handle_transition(terminal, app, before);

                // Redraws are suspended while the terminal is unfocused; the
                // deadline math does not depend on them.
                let animating = app.celebration.is_active
                    || !matches!(app.game.phase, Phase::Selection | Phase::Ended);
                if app.focused && animating {
                    terminal.draw(|f| draw(app, f))?;
                }
            }
            AppEvent::FocusLost => {
                app.focused = false;
            }
            AppEvent::FocusGained => {
                app.focused = true;
                app.now = SystemTime::now();
                terminal.draw(|f| draw(app, f))?;
            }
            AppEvent::Resize => {
                terminal.draw(|f| draw(app, f))?;
            }
            AppEvent::Key(key) => {
                app.now = SystemTime::now();
                let before = app.game.phase;
                if handle_key(app, key) {
                    break;
                }
                handle_transition(terminal, app, before);
                terminal.draw(|f| draw(app, f))?;
            }
        }
    }

    Ok(())
}

/// React to phase changes made by ticks or keys: keep the session snapshot
/// in step and fire the celebration when a round ends on a high score.
fn handle_transition<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, before: Phase) {
    let after = app.game.phase;
    if before == after {
        app.persist_session();
        return;
    }

    match after {
        Phase::Playing => app.persist_session(),
        Phase::Ended => {
            app.drop_session();
            let is_high = app
                .game
                .outcome
                .as_ref()
                .is_some_and(|outcome| outcome.is_high_score);
            if is_high {
                let size = terminal.size().unwrap_or_default();
                app.celebration.start(size.width, size.height);
            }
        }
        Phase::Selection => app.drop_session(),
        _ => {}
    }
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match key.code {
        KeyCode::Esc => match app.game.phase {
            Phase::Selection | Phase::Ended => return true,
            // Any in-round escape is a manual end: discard, never persist.
            _ => {
                app.game.end_game(EndReason::Manual, app.now);
                app.drop_session();
            }
        },
        KeyCode::Enter => match app.game.phase {
            Phase::Selection => app.game.start_round(app.now),
            Phase::Ended => app.game.play_again(app.now),
            _ => {}
        },
        KeyCode::Backspace => app.game.backspace(),
        KeyCode::Char(c) => match app.game.phase {
            Phase::Warmup | Phase::Playing if c.is_ascii_digit() => {
                app.game.push_digit(c, app.now);
            }
            Phase::Playing if c == '-' => app.game.toggle_negative(app.now),
            Phase::Ended => match c {
                'r' => app.game.play_again(app.now),
                'm' => app.game.back_to_menu(),
                _ => {}
            },
            _ => {}
        },
        _ => {}
    }
    false
}

fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
