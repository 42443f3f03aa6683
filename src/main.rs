use clap::{error::ErrorKind, CommandFactory, Parser, ValueEnum};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
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
    time::Duration,
};
use webbrowser::Browser;

use mathdash::config::{Config, ConfigStore, FileConfigStore, TIME_LIMIT_CHOICES_MS};
use mathdash::equation::GenPolicy;
use mathdash::history::SessionRecord;
use mathdash::leaderboard::{LeaderboardDb, LeaderboardEntry};
use mathdash::runtime::{CrosstermEventSource, FixedTicker, GameEvent, Runner, SessionClock};
use mathdash::score_service::{ScoreRouter, UnavailableScoreService};
use mathdash::session::{Mode, Session, SessionConfig, SessionResult};
use mathdash::ui::{self, GameOverView, KeyHints};
use mathdash::TICK_RATE_MS;

/// fast-paced true/false arithmetic for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Judge arithmetic statements TRUE or FALSE before the countdown runs out. \
Difficulty scales with your score; play alone, co-op, or head-to-head at one keyboard."
)]
pub struct Cli {
    /// play mode to jump straight into (defaults to the configured preference)
    #[clap(short = 'm', long, value_enum)]
    mode: Option<ModeOpt>,

    /// per-question time limit in seconds (1, 2 or 3)
    #[clap(short = 's', long)]
    secs: Option<u64>,

    /// statement policy
    #[clap(short = 'p', long, value_enum, default_value_t = PolicyOpt::Scaled)]
    policy: PolicyOpt,

    /// put the TRUE answer on the right-hand key instead of the left
    #[clap(long)]
    true_on_right: bool,

    /// seed the statement stream for a replayable run
    #[clap(long)]
    seed: Option<u64>,

    /// open straight onto the leaderboard
    #[clap(short = 'l', long)]
    leaderboard: bool,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum ModeOpt {
    Solo,
    Coop,
    Versus,
}

impl ModeOpt {
    fn as_mode(&self) -> Mode {
        match self {
            ModeOpt::Solo => Mode::Solo,
            ModeOpt::Coop => Mode::Coop,
            ModeOpt::Versus => Mode::Versus,
        }
    }
}

/// Scaled is addition with difficulty-driven ranges; Mixed is all three
/// operators over a fixed range.
#[derive(Debug, Copy, Clone, ValueEnum, strum_macros::Display)]
pub enum PolicyOpt {
    Scaled,
    Mixed,
}

impl PolicyOpt {
    fn as_policy(&self) -> GenPolicy {
        match self {
            PolicyOpt::Scaled => GenPolicy::Scaled,
            PolicyOpt::Mixed => GenPolicy::Mixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Screen {
    Home,
    Playing,
    GameOver,
    Leaderboard,
}

pub struct App {
    config: Config,
    store: FileConfigStore,
    screen: Screen,
    session: Option<Session>,
    clock: SessionClock,
    game_over: Option<GameOverView>,
    score_submitted: bool,
    db: Option<LeaderboardDb>,
    router: ScoreRouter<UnavailableScoreService>,
    entries: Vec<LeaderboardEntry>,
    policy: GenPolicy,
    seed: Option<u64>,
    last_mode: Mode,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let store = FileConfigStore::new();
        let mut config = store.load();

        if let Some(secs) = cli.secs {
            config.time_limit_ms = secs * 1_000;
        }
        if cli.true_on_right {
            config.true_button_on_left = false;
        }
        let last_mode = cli
            .mode
            .map(|m| m.as_mode())
            .unwrap_or(config.preferred_mode);
        config.preferred_mode = last_mode;

        let mut app = Self {
            config,
            store,
            screen: Screen::Home,
            session: None,
            clock: SessionClock::start(),
            game_over: None,
            score_submitted: false,
            db: LeaderboardDb::new().ok(),
            router: ScoreRouter::new(UnavailableScoreService),
            entries: Vec::new(),
            policy: cli.policy.as_policy(),
            seed: cli.seed,
            last_mode,
        };

        if cli.leaderboard {
            app.open_leaderboard();
        } else if cli.mode.is_some() {
            app.start_session(last_mode);
        }
        app
    }

    fn start_session(&mut self, mode: Mode) {
        let session_config = SessionConfig {
            mode,
            time_limit_ms: self.config.time_limit_ms,
            policy: self.policy,
        };
        self.session = Some(match self.seed {
            Some(seed) => Session::seeded(session_config, seed),
            None => Session::new(session_config),
        });
        self.clock = SessionClock::start();
        self.last_mode = mode;
        self.config.preferred_mode = mode;
        self.game_over = None;
        self.score_submitted = false;
        self.screen = Screen::Playing;
    }

    fn open_leaderboard(&mut self) {
        if self.router.show_native_leaderboard() {
            return;
        }
        self.refresh_entries();
        self.screen = Screen::Leaderboard;
    }

    fn refresh_entries(&mut self) {
        self.entries = self
            .db
            .as_ref()
            .and_then(|db| db.top_entries().ok())
            .unwrap_or_default();
    }

    fn on_tick(&mut self) {
        if self.screen != Screen::Playing {
            return;
        }
        let now_ms = self.clock.now_ms();
        let over = match self.session.as_mut() {
            Some(session) => {
                session.tick(now_ms);
                session.is_over()
            }
            None => false,
        };
        if over {
            self.finish_session();
        }
    }

    fn finish_session(&mut self) {
        let session = match self.session.take() {
            Some(s) => s,
            None => return,
        };
        let result = match session.result() {
            Some(r) => r,
            None => return,
        };

        let record = SessionRecord::from_result(
            session.mode(),
            session.time_limit_ms(),
            &result,
            session.reaction_times_ms(0),
        );
        let _ = record.append();

        let made_top = match result {
            SessionResult::Solo { score, .. } => self
                .db
                .as_ref()
                .map(|db| self.router.would_make_top_list(db, score))
                .unwrap_or(false),
            SessionResult::Duo { .. } => false,
        };

        self.game_over = Some(GameOverView {
            result,
            reactions_ms: session.reaction_times_ms(0).to_vec(),
            made_top,
            name_input: self.config.username.clone().unwrap_or_default(),
            submit_status: None,
        });
        self.screen = Screen::GameOver;
    }

    fn submit_entered_score(&mut self) {
        let Some(view) = self.game_over.as_mut() else {
            return;
        };
        let SessionResult::Solo { score, .. } = view.result else {
            return;
        };
        let Some(db) = self.db.as_mut() else {
            return;
        };
        let name = view.name_input.clone();
        let outcome = self
            .router
            .submit(db, Some(&name), score, self.config.time_limit_ms);
        if outcome.success {
            self.score_submitted = true;
            self.config.username = Some(name.trim().to_string());
        }
        view.submit_status = Some(outcome);
    }

    /// TRUE/FALSE resolution honoring the button-side setting. Solo accepts
    /// both key groups; in the two-player modes `a`/`d` belong to player 1
    /// and the arrows to player 2.
    fn solo_choice(&self, code: KeyCode) -> Option<bool> {
        let left_is_true = self.config.true_button_on_left;
        match code {
            KeyCode::Char('a') | KeyCode::Left => Some(left_is_true),
            KeyCode::Char('d') | KeyCode::Right => Some(!left_is_true),
            _ => None,
        }
    }

    fn p1_choice(&self, code: KeyCode) -> Option<bool> {
        let left_is_true = self.config.true_button_on_left;
        match code {
            KeyCode::Char('a') => Some(left_is_true),
            KeyCode::Char('d') => Some(!left_is_true),
            _ => None,
        }
    }

    fn p2_choice(&self, code: KeyCode) -> Option<bool> {
        let left_is_true = self.config.true_button_on_left;
        match code {
            KeyCode::Left => Some(left_is_true),
            KeyCode::Right => Some(!left_is_true),
            _ => None,
        }
    }

    fn p1_hints(&self) -> KeyHints {
        if self.config.true_button_on_left {
            KeyHints { true_key: "a", false_key: "d" }
        } else {
            KeyHints { true_key: "d", false_key: "a" }
        }
    }

    fn p2_hints(&self) -> KeyHints {
        if self.config.true_button_on_left {
            KeyHints { true_key: "←", false_key: "→" }
        } else {
            KeyHints { true_key: "→", false_key: "←" }
        }
    }

    fn cycle_time_limit(&mut self, up: bool) {
        let choices = TIME_LIMIT_CHOICES_MS;
        let idx = choices
            .iter()
            .position(|&ms| ms == self.config.time_limit_ms)
            .unwrap_or(1);
        let next = if up {
            (idx + 1).min(choices.len() - 1)
        } else {
            idx.saturating_sub(1)
        };
        self.config.time_limit_ms = choices[next];
    }

    /// Returns true when the app should exit.
    fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match self.screen {
            Screen::Home => match key.code {
                KeyCode::Esc => return true,
                KeyCode::Char('1') => self.start_session(Mode::Solo),
                KeyCode::Char('2') => self.start_session(Mode::Coop),
                KeyCode::Char('3') => self.start_session(Mode::Versus),
                KeyCode::Enter => self.start_session(self.last_mode),
                KeyCode::Char('l') => self.open_leaderboard(),
                KeyCode::Char('-') => self.cycle_time_limit(false),
                KeyCode::Char('+') | KeyCode::Char('=') => self.cycle_time_limit(true),
                _ => {}
            },
            Screen::Playing => {
                if key.code == KeyCode::Esc {
                    // abandoned runs are not recorded
                    self.session = None;
                    self.screen = Screen::Home;
                    return false;
                }
                let mode = match self.session.as_ref().map(|s| s.mode()) {
                    Some(mode) => mode,
                    None => return false,
                };
                let routed = match mode {
                    Mode::Solo => self.solo_choice(key.code).map(|choice| (0, choice)),
                    Mode::Coop | Mode::Versus => self
                        .p1_choice(key.code)
                        .map(|choice| (0, choice))
                        .or_else(|| self.p2_choice(key.code).map(|choice| (1, choice))),
                };
                let now_ms = self.clock.now_ms();
                let mut over = false;
                if let (Some((player, choice)), Some(session)) = (routed, self.session.as_mut()) {
                    session.submit_answer(player, now_ms, choice);
                    over = session.is_over();
                }
                if over {
                    self.finish_session();
                }
            }
            Screen::GameOver => {
                let entering_name = self
                    .game_over
                    .as_ref()
                    .map(|v| v.made_top && !self.score_submitted)
                    .unwrap_or(false);

                if entering_name {
                    match key.code {
                        KeyCode::Esc => self.screen = Screen::Home,
                        KeyCode::Enter => self.submit_entered_score(),
                        KeyCode::Backspace => {
                            if let Some(view) = self.game_over.as_mut() {
                                view.name_input.pop();
                            }
                        }
                        KeyCode::Char(c) => {
                            if let Some(view) = self.game_over.as_mut() {
                                if (c.is_ascii_alphanumeric() || c == '_' || c == ' ')
                                    && view.name_input.len() < 20
                                {
                                    view.name_input.push(c);
                                }
                            }
                        }
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Esc => return true,
                        KeyCode::Char('r') => self.start_session(self.last_mode),
                        KeyCode::Char('m') => self.screen = Screen::Home,
                        KeyCode::Char('l') => self.open_leaderboard(),
                        KeyCode::Char('t') => self.share_score(),
                        _ => {}
                    }
                }
            }
            Screen::Leaderboard => match key.code {
                KeyCode::Esc | KeyCode::Char('b') => {
                    self.screen = if self.game_over.is_some() {
                        Screen::GameOver
                    } else {
                        Screen::Home
                    };
                }
                _ => {}
            },
        }
        false
    }

    fn share_score(&self) {
        let Some(view) = self.game_over.as_ref() else {
            return;
        };
        let text = match view.result {
            SessionResult::Solo { score, .. } => format!("{}%20in%20mathdash", score),
            SessionResult::Duo { scores, .. } => {
                format!("{}%20vs%20{}%20in%20mathdash", scores.0, scores.1)
            }
        };
        if Browser::is_available() {
            webbrowser::open(&format!(
                "https://twitter.com/intent/tweet?text=I%20scored%20{}%0A%0Ahttps%3A%2F%2Fgithub.com%2Fmartintrojer%2Fmathdash",
                text
            ))
            .unwrap_or_default();
        }
    }
}

fn draw(app: &App, f: &mut Frame) {
    match app.screen {
        Screen::Home => ui::render_home(f, app.last_mode, app.config.time_limit_ms),
        Screen::Playing => {
            if let Some(session) = app.session.as_ref() {
                ui::render_game(
                    f,
                    &session.snapshot(),
                    session.mode(),
                    session.time_limit_ms(),
                    &app.p1_hints(),
                    &app.p2_hints(),
                );
            }
        }
        Screen::GameOver => {
            if let Some(view) = app.game_over.as_ref() {
                ui::render_game_over(f, view);
            }
        }
        Screen::Leaderboard => ui::render_leaderboard(f, &app.entries),
    }
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| draw(app, f))?;

        match runner.step() {
            GameEvent::Tick => app.on_tick(),
            GameEvent::Resize => {}
            GameEvent::Key(key) => {
                if app.on_key(key) {
                    break;
                }
            }
        }
    }

    app.store.save(&app.config)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(secs) = cli.secs {
        if !TIME_LIMIT_CHOICES_MS.contains(&(secs * 1_000)) {
            let mut cmd = Cli::command();
            cmd.error(
                ErrorKind::ValueValidation,
                "time limit must be 1, 2 or 3 seconds",
            )
            .exit();
        }
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}
