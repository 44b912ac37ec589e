//! Game sessions and the arena that runs them.
//!
//! Each game owns its agent for the lifetime of one session, advances on a
//! single cooperative tick, and exports a coarse summary to the profile when
//! it ends.

pub mod connect_four;
pub mod dodge;
pub mod memory;
pub mod pong;
pub mod rps;
pub mod scheduler;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::{Insight, PaddleMove, Vec2};
use crate::config::ArenaConfig;
use crate::profile::{GameId, GameResult, GameStats, PatternSummary, ProfileStore};

pub use connect_four::{ConnectFourConfig, ConnectFourSession, ConnectFourView};
pub use dodge::{DodgeConfig, DodgeSession, DodgeView};
pub use memory::{CardFace, MemoryConfig, MemorySession, MemoryView};
pub use pong::{PongConfig, PongSession, PongView};
pub use rps::{RpsConfig, RpsRound, RpsSession, RpsView};
pub use scheduler::{Scheduler, SessionToken};

/// One tick's worth of player input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerInput {
    None,
    /// Paddle duel: move the left paddle.
    Paddle(PaddleMove),
    /// Connect Four: drop into a column.
    Column(usize),
    /// Rock-paper-scissors: throw a choice index.
    Throw(usize),
    /// Dodge: steering direction; lengths above one are normalized.
    Steer(Vec2),
    /// Memory match: flip the card at an index.
    Flip(usize),
}

/// What a session did with the tick's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    Accepted,
    /// No input, or nothing to do with it.
    Idle,
    /// An outcome is pending (AI turn, reveal, mismatch, peek); input dropped.
    Busy,
    /// Input not valid for this game or state.
    Invalid,
    NotRunning,
}

/// Render-ready snapshot of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum GameView {
    Pong(PongView),
    ConnectFour(ConnectFourView),
    Rps(RpsView),
    Dodge(DodgeView),
    Memory(MemoryView),
}

/// What a session hands to the profile when it ends.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub game: GameId,
    /// `None` when the session was stopped before it finished.
    pub result: Option<GameResult>,
    pub patterns: Vec<String>,
    pub pattern_summary: PatternSummary,
    pub ticks: u64,
}

/// Common surface of every game.
pub trait GameSession {
    fn game_id(&self) -> GameId;

    /// Reset and begin a fresh run, seeding the agent from profile stats.
    fn start(&mut self, stats: &GameStats);

    /// Halt the run and cancel every pending delayed effect.
    fn stop(&mut self);

    fn tick(&mut self, input: PlayerInput) -> InputStatus;

    fn is_running(&self) -> bool;

    fn is_finished(&self) -> bool;

    fn view(&self) -> GameView;

    fn insights(&self) -> Vec<Insight>;

    fn summary(&self) -> SessionSummary;
}

pub(crate) fn session_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Build the session for `game` from the arena configuration.
pub fn new_session(game: GameId, config: &ArenaConfig, seed: Option<u64>) -> Box<dyn GameSession> {
    match game {
        GameId::Pong => Box::new(PongSession::new(config.pong.clone(), seed)),
        GameId::ConnectFour => Box::new(ConnectFourSession::new(config.connect_four.clone(), seed)),
        GameId::Rps => Box::new(RpsSession::new(config.rps.clone(), seed)),
        GameId::Dodge => Box::new(DodgeSession::new(config.dodge.clone(), seed)),
        GameId::Memory => Box::new(MemorySession::new(config.memory.clone(), seed)),
    }
}

/// Runs one session at a time and reports each to the profile store.
pub struct Arena<S: ProfileStore> {
    config: ArenaConfig,
    store: S,
    session: Option<Box<dyn GameSession>>,
    recorded: bool,
    next_seed: Option<u64>,
}

impl<S: ProfileStore> Arena<S> {
    pub fn new(config: ArenaConfig, store: S) -> Self {
        let next_seed = config.session.seed;
        Arena {
            config,
            store,
            session: None,
            recorded: false,
            next_seed,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(mut self) -> S {
        self.stop();
        self.store
    }

    pub fn current_game(&self) -> Option<GameId> {
        self.session.as_ref().map(|s| s.game_id())
    }

    /// Stop whatever is running and start `game`.
    pub fn start(&mut self, game: GameId) {
        self.stop();

        let seed = self.next_seed;
        self.next_seed = seed.map(|s| s.wrapping_add(1));

        let stats = self.store.game_stats(game);
        let mut session = new_session(game, &self.config, seed);
        session.start(&stats);
        log::info!(
            "starting {} (played {}, won {})",
            game.title(),
            stats.played,
            stats.wins
        );
        self.session = Some(session);
        self.recorded = false;
    }

    /// Advance the running session by one tick. A session that finishes on
    /// this tick is recorded immediately.
    pub fn tick(&mut self, input: PlayerInput) -> InputStatus {
        let Some(session) = self.session.as_mut() else {
            return InputStatus::NotRunning;
        };
        let status = session.tick(input);
        if session.is_finished() {
            self.record_once();
        }
        status
    }

    pub fn is_finished(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_finished())
    }

    pub fn view(&self) -> Option<GameView> {
        self.session.as_ref().map(|s| s.view())
    }

    pub fn insights(&self) -> Vec<Insight> {
        self.session
            .as_ref()
            .map(|s| s.insights())
            .unwrap_or_default()
    }

    /// Stop the running session, record it if that has not happened yet, and
    /// return its summary.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        self.record_once();
        let mut session = self.session.take()?;
        session.stop();
        Some(session.summary())
    }

    fn record_once(&mut self) {
        if self.recorded {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let summary = session.summary();
        match summary.result {
            Some(result) => {
                log::info!(
                    "{} finished after {} ticks: {:?} {:?}",
                    summary.game.title(),
                    summary.ticks,
                    result,
                    summary.patterns
                );
                self.store.record_game(summary.game, result, &summary.patterns);
            }
            None => log::info!("{} abandoned after {} ticks", summary.game.title(), summary.ticks),
        }
        self.store.update_patterns(summary.game, summary.pattern_summary);
        self.recorded = true;
    }
}
