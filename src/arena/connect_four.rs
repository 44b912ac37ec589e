//! Connect Four against the adaptive search agent. The AI reply is always a
//! scheduled event, so the search never runs on the input path.

use serde::{Deserialize, Serialize};

use crate::ai::{AdaptiveSearchAgent, Agent, ColumnWeights, Insight, SearchConfig, SearchFeedback};
use crate::arena::scheduler::Scheduler;
use crate::arena::{GameSession, GameView, InputStatus, PlayerInput, SessionSummary};
use crate::game::{Board, GameOutcome, GameState, Side, CENTER_COL, COLS};
use crate::profile::{GameId, GameResult, GameStats, PatternSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectFourConfig {
    /// Ticks between the human's move and the AI reply.
    pub ai_delay_ticks: u64,
    pub human_first: bool,
    pub search: SearchConfig,
}

impl Default for ConnectFourConfig {
    fn default() -> Self {
        ConnectFourConfig {
            ai_delay_ticks: 1,
            human_first: true,
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectFourView {
    pub board: Board,
    pub to_move: Side,
    pub outcome: Option<GameOutcome>,
    pub ai_thinking: bool,
    pub legal_columns: Vec<usize>,
    pub last_ai_column: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectFourEvent {
    AiTurn,
}

pub struct ConnectFourSession {
    config: ConnectFourConfig,
    state: GameState,
    agent: AdaptiveSearchAgent,
    scheduler: Scheduler<ConnectFourEvent>,
    running: bool,
    finished: bool,
    ticks: u64,
    human_columns: [u32; COLS],
    last_ai_column: Option<usize>,
}

impl ConnectFourSession {
    /// Search is deterministic, so the seed is unused.
    pub fn new(config: ConnectFourConfig, _seed: Option<u64>) -> Self {
        let agent = AdaptiveSearchAgent::new(config.search.clone(), 0, ColumnWeights::default());
        ConnectFourSession {
            state: GameState::initial(first_side(&config)),
            config,
            agent,
            scheduler: Scheduler::new(),
            running: false,
            finished: false,
            ticks: 0,
            human_columns: [0; COLS],
            last_ai_column: None,
        }
    }

    pub fn agent(&self) -> &AdaptiveSearchAgent {
        &self.agent
    }

    fn ai_pending(&self) -> bool {
        self.scheduler.has_pending(|e| *e == ConnectFourEvent::AiTurn)
    }

    fn play_human(&mut self, column: usize) -> InputStatus {
        if self.ai_pending() || self.state.to_move() != Side::Human {
            return InputStatus::Busy;
        }
        let opening = self.state.opening_of(Side::Human).is_none();
        if let Err(e) = self.state.apply_move_mut(column) {
            log::debug!("rejected column {column}: {e}");
            return InputStatus::Invalid;
        }

        self.human_columns[column] += 1;
        self.agent
            .observe(SearchFeedback::OpponentMoved { column, opening });

        if self.state.is_terminal() {
            self.end_game();
        } else {
            self.scheduler
                .schedule(self.config.ai_delay_ticks, ConnectFourEvent::AiTurn);
        }
        InputStatus::Accepted
    }

    fn play_ai(&mut self) {
        if self.state.is_terminal() || self.state.to_move() != Side::Ai {
            return;
        }
        let mut column = self.agent.decide(&self.state);
        if let Err(e) = self.state.apply_move_mut(column) {
            log::warn!("search picked column {column} ({e}); falling back");
            let Some(&legal) = self.state.legal_actions().first() else {
                return;
            };
            column = legal;
            if self.state.apply_move_mut(column).is_err() {
                return;
            }
        }
        self.last_ai_column = Some(column);
        if self.state.is_terminal() {
            self.end_game();
        }
    }

    fn end_game(&mut self) {
        if let Some(outcome) = self.state.outcome() {
            self.agent.observe(SearchFeedback::GameEnded(outcome));
            match outcome {
                GameOutcome::Winner(side) => log::debug!("connect four won by {}", side.name()),
                GameOutcome::Draw => log::debug!("connect four drawn"),
            }
        }
        self.finished = true;
        self.running = false;
        self.scheduler.cancel_all();
    }

    fn patterns(&self) -> Vec<String> {
        let mut tags = Vec::new();
        match self.state.opening_of(Side::Human) {
            Some(CENTER_COL) => tags.push("Opens center".to_string()),
            Some(0) | Some(6) => tags.push("Opens on the edge".to_string()),
            Some(_) => tags.push("Opens off-center".to_string()),
            None => {}
        }

        let total: u32 = self.human_columns.iter().sum();
        if total >= 4 {
            if let Some((col, &count)) = self
                .human_columns
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))
            {
                if f64::from(count) / f64::from(total) >= 0.4 {
                    tags.push(format!("Favors column {}", col + 1));
                }
            }
        }
        tags
    }
}

fn first_side(config: &ConnectFourConfig) -> Side {
    if config.human_first {
        Side::Human
    } else {
        Side::Ai
    }
}

impl GameSession for ConnectFourSession {
    fn game_id(&self) -> GameId {
        GameId::ConnectFour
    }

    fn start(&mut self, stats: &GameStats) {
        let weights = match &stats.last_summary {
            Some(PatternSummary::ConnectFour { column_weights, .. }) => ColumnWeights(*column_weights),
            _ => ColumnWeights::default(),
        };
        self.agent = AdaptiveSearchAgent::new(self.config.search.clone(), stats.played, weights);
        self.state = GameState::initial(first_side(&self.config));
        self.scheduler.cancel_all();
        self.running = true;
        self.finished = false;
        self.ticks = 0;
        self.human_columns = [0; COLS];
        self.last_ai_column = None;
        if self.state.to_move() == Side::Ai {
            self.scheduler
                .schedule(self.config.ai_delay_ticks, ConnectFourEvent::AiTurn);
        }
        log::debug!("connect four search depth {}", self.agent.depth());
    }

    fn stop(&mut self) {
        self.running = false;
        self.scheduler.cancel_all();
    }

    fn tick(&mut self, input: PlayerInput) -> InputStatus {
        if !self.running {
            return InputStatus::NotRunning;
        }
        self.ticks += 1;

        for event in self.scheduler.advance() {
            match event {
                ConnectFourEvent::AiTurn => self.play_ai(),
            }
        }
        if self.finished {
            return InputStatus::Idle;
        }

        match input {
            PlayerInput::Column(column) => self.play_human(column),
            PlayerInput::None => InputStatus::Idle,
            _ => InputStatus::Invalid,
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn view(&self) -> GameView {
        GameView::ConnectFour(ConnectFourView {
            board: *self.state.board(),
            to_move: self.state.to_move(),
            outcome: self.state.outcome(),
            ai_thinking: self.ai_pending(),
            legal_columns: self.state.legal_actions(),
            last_ai_column: self.last_ai_column,
        })
    }

    fn insights(&self) -> Vec<Insight> {
        self.agent.insights()
    }

    fn summary(&self) -> SessionSummary {
        let result = match (self.finished, self.state.outcome()) {
            (true, Some(GameOutcome::Winner(Side::Human))) => Some(GameResult::Win),
            (true, Some(GameOutcome::Winner(Side::Ai))) => Some(GameResult::Loss),
            (true, Some(GameOutcome::Draw)) => Some(GameResult::Draw),
            _ => None,
        };
        let learned = self.agent.summary();
        SessionSummary {
            game: GameId::ConnectFour,
            result,
            patterns: self.patterns(),
            pattern_summary: PatternSummary::ConnectFour {
                column_weights: learned.column_weights.0,
                depth: learned.depth,
                favorite_opening: self.state.opening_of(Side::Human),
            },
            ticks: self.ticks,
        }
    }
}
