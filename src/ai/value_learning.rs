use std::collections::HashMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::agent::{Agent, Insight, InsightTone};

/// Tabular value-learning hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ValueLearningConfig {
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_floor: f64,
    /// Multiplier applied to epsilon every time the agent scores.
    pub epsilon_decay: f64,
    /// Distinct states required before the learned table drives decisions.
    pub min_states_for_policy: usize,
    /// Ticks the baseline tracker extrapolates the ball forward.
    pub lookahead_ticks: f64,
    /// Half-height of the band around the target where the paddle holds still.
    pub dead_zone: f64,
    pub x_bins: u8,
    pub y_bins: u8,
    pub paddle_bins: u8,
}

impl Default for ValueLearningConfig {
    fn default() -> Self {
        ValueLearningConfig {
            alpha: 0.3,
            gamma: 0.9,
            epsilon_start: 0.3,
            epsilon_floor: 0.05,
            epsilon_decay: 0.95,
            min_states_for_policy: 20,
            lookahead_ticks: 12.0,
            dead_zone: 6.0,
            x_bins: 8,
            y_bins: 6,
            paddle_bins: 6,
        }
    }
}

/// Paddle command. Enumeration order is the argmax tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaddleMove {
    Up,
    Stay,
    Down,
}

impl PaddleMove {
    pub const ALL: [PaddleMove; 3] = [PaddleMove::Up, PaddleMove::Stay, PaddleMove::Down];

    fn index(self) -> usize {
        match self {
            PaddleMove::Up => 0,
            PaddleMove::Stay => 1,
            PaddleMove::Down => 2,
        }
    }

    /// Vertical direction in screen coordinates (y grows downward).
    pub fn direction(self) -> f64 {
        match self {
            PaddleMove::Up => -1.0,
            PaddleMove::Stay => 0.0,
            PaddleMove::Down => 1.0,
        }
    }
}

/// What the agent sees each tick. The agent defends the right edge of the
/// court (x = `width`), so positive `ball_vx` means the ball is approaching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CourtView {
    pub ball_x: f64,
    pub ball_y: f64,
    pub ball_vx: f64,
    pub ball_vy: f64,
    /// Center of the agent's paddle.
    pub paddle_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Reward events reported by the duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reward {
    /// The agent returned the ball.
    Hit,
    /// The ball got past the human; the point goes to the agent.
    Scored,
    /// The ball got past the agent.
    Conceded,
}

impl Reward {
    pub fn value(self) -> f64 {
        match self {
            Reward::Hit => 1.0,
            Reward::Scored => 10.0,
            Reward::Conceded => -10.0,
        }
    }

    fn ends_point(self) -> bool {
        matches!(self, Reward::Scored | Reward::Conceded)
    }
}

/// Continuous court state reduced to a small lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscretizedState {
    pub ball_x: u8,
    pub ball_y: u8,
    pub heading: i8,
    pub vertical: i8,
    pub paddle: u8,
}

fn bin(value: f64, extent: f64, bins: u8) -> u8 {
    if extent <= 0.0 || !value.is_finite() {
        return 0;
    }
    let ratio = (value / extent).clamp(0.0, 1.0);
    ((ratio * f64::from(bins)).floor() as u8).min(bins.saturating_sub(1))
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

impl DiscretizedState {
    pub fn from_view(view: &CourtView, config: &ValueLearningConfig) -> Self {
        DiscretizedState {
            ball_x: bin(view.ball_x, view.width, config.x_bins),
            ball_y: bin(view.ball_y, view.height, config.y_bins),
            heading: if view.ball_vx > 0.0 { 1 } else { -1 },
            vertical: sign(view.ball_vy),
            paddle: bin(view.paddle_y, view.height, config.paddle_bins),
        }
    }
}

impl fmt::Display for DiscretizedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.ball_x, self.ball_y, self.heading, self.vertical, self.paddle
        )
    }
}

/// (state, action) → estimated return. Missing entries read as 0.
#[derive(Debug, Clone, Default)]
pub struct ValueTable {
    values: HashMap<DiscretizedState, [f64; 3]>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct states with at least one update.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, state: &DiscretizedState, action: PaddleMove) -> f64 {
        self.values
            .get(state)
            .map_or(0.0, |row| row[action.index()])
    }

    pub fn max_value(&self, state: &DiscretizedState) -> f64 {
        self.values
            .get(state)
            .map_or(0.0, |row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    /// Best action for a tabulated state, ties going to the first enumerated.
    pub fn best_action(&self, state: &DiscretizedState) -> Option<PaddleMove> {
        let row = self.values.get(state)?;
        let mut best = PaddleMove::ALL[0];
        for action in PaddleMove::ALL {
            if row[action.index()] > row[best.index()] {
                best = action;
            }
        }
        Some(best)
    }

    /// Temporal-difference update. `next` is `None` when the point ended, in
    /// which case the target is the reward alone. Returns the new estimate.
    pub fn td_update(
        &mut self,
        state: DiscretizedState,
        action: PaddleMove,
        reward: f64,
        next: Option<&DiscretizedState>,
        alpha: f64,
        gamma: f64,
    ) -> f64 {
        let bootstrap = next.map_or(0.0, |n| self.max_value(n));
        let target = reward + gamma * bootstrap;
        let row = self.values.entry(state).or_insert([0.0; 3]);
        let old = row[action.index()];
        let updated = old + alpha * (target - old);
        row[action.index()] = updated;
        updated
    }
}

/// Which policy produced the most recent decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySource {
    Baseline,
    Explore,
    Learned,
}

/// Coarse numbers exported to the profile at session end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueSummary {
    pub table_size: usize,
    pub epsilon: f64,
    pub updates: u64,
}

/// Epsilon-greedy tabular learner for the paddle duel.
pub struct ValueLearningAgent {
    config: ValueLearningConfig,
    table: ValueTable,
    epsilon: f64,
    pending: Option<(DiscretizedState, PaddleMove)>,
    pending_reward: f64,
    point_ended: bool,
    updates: u64,
    decisions: u64,
    learned_decisions: u64,
    last_source: PolicySource,
    rng: StdRng,
}

impl ValueLearningAgent {
    pub fn new(config: ValueLearningConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: ValueLearningConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ValueLearningConfig, rng: StdRng) -> Self {
        let epsilon = config.epsilon_start.max(config.epsilon_floor);
        ValueLearningAgent {
            config,
            table: ValueTable::new(),
            epsilon,
            pending: None,
            pending_reward: 0.0,
            point_ended: false,
            updates: 0,
            decisions: 0,
            learned_decisions: 0,
            last_source: PolicySource::Baseline,
            rng,
        }
    }

    /// Resume exploration from a previous session's decayed epsilon. Only
    /// ever lowers epsilon, and never below the floor.
    pub fn resume_epsilon(&mut self, epsilon: f64) {
        if epsilon.is_finite() {
            self.epsilon = epsilon.max(self.config.epsilon_floor).min(self.epsilon);
        }
    }

    /// Close the episode: the pending step is trained on the rewards it
    /// collected with no successor state to bootstrap from.
    pub fn end_episode(&mut self) {
        self.apply_pending(None);
        self.point_ended = false;
    }

    fn apply_pending(&mut self, next: Option<&DiscretizedState>) {
        if let Some((prev_state, prev_action)) = self.pending.take() {
            self.table.td_update(
                prev_state,
                prev_action,
                self.pending_reward,
                next,
                self.config.alpha,
                self.config.gamma,
            );
            self.updates += 1;
        }
        self.pending_reward = 0.0;
    }

    fn decay_epsilon(&mut self) {
        let decayed = self.epsilon * self.config.epsilon_decay;
        if decayed.is_finite() {
            self.epsilon = decayed.max(self.config.epsilon_floor).min(self.epsilon);
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    pub fn last_source(&self) -> PolicySource {
        self.last_source
    }

    pub fn summary(&self) -> ValueSummary {
        ValueSummary {
            table_size: self.table.len(),
            epsilon: self.epsilon,
            updates: self.updates,
        }
    }

    /// Deterministic ball tracker: extrapolate the ball a few ticks forward,
    /// reflecting off the walls, and steer the paddle toward that point.
    pub fn baseline(&self, view: &CourtView) -> PaddleMove {
        let target = if view.ball_vx > 0.0 {
            reflect(
                view.ball_y + view.ball_vy * self.config.lookahead_ticks,
                view.height,
            )
        } else {
            view.height / 2.0
        };
        let diff = target - view.paddle_y;
        if diff < -self.config.dead_zone {
            PaddleMove::Up
        } else if diff > self.config.dead_zone {
            PaddleMove::Down
        } else {
            PaddleMove::Stay
        }
    }

    fn select(&mut self, view: &CourtView, state: &DiscretizedState) -> (PaddleMove, PolicySource) {
        if self.table.len() < self.config.min_states_for_policy {
            return (self.baseline(view), PolicySource::Baseline);
        }
        if self.rng.random::<f64>() < self.epsilon {
            let idx = self.rng.random_range(0..PaddleMove::ALL.len());
            return (PaddleMove::ALL[idx], PolicySource::Explore);
        }
        match self.table.best_action(state) {
            Some(action) => (action, PolicySource::Learned),
            None => (self.baseline(view), PolicySource::Baseline),
        }
    }
}

/// Fold a free-flight y coordinate back into [0, height].
fn reflect(y: f64, height: f64) -> f64 {
    if height <= 0.0 {
        return 0.0;
    }
    let period = 2.0 * height;
    let m = y.rem_euclid(period);
    if m > height {
        period - m
    } else {
        m
    }
}

impl Agent for ValueLearningAgent {
    type Observation = CourtView;
    type Action = PaddleMove;
    type Outcome = Reward;

    fn decide(&mut self, view: &CourtView) -> PaddleMove {
        let state = DiscretizedState::from_view(view, &self.config);

        let next = if self.point_ended { None } else { Some(&state) };
        self.apply_pending(next);
        self.point_ended = false;

        let (action, source) = self.select(view, &state);
        self.pending = Some((state, action));
        self.last_source = source;
        self.decisions += 1;
        if source == PolicySource::Learned {
            self.learned_decisions += 1;
        }
        action
    }

    fn observe(&mut self, reward: Reward) {
        self.pending_reward += reward.value();
        if reward.ends_point() {
            self.point_ended = true;
        }
        if reward == Reward::Scored {
            self.decay_epsilon();
        }
    }

    fn insights(&self) -> Vec<Insight> {
        let coverage =
            self.table.len() as f64 / (self.config.min_states_for_policy as f64 * 5.0);
        let learned_share = if self.decisions == 0 {
            0.0
        } else {
            self.learned_decisions as f64 / self.decisions as f64
        };
        let policy = match self.last_source {
            PolicySource::Baseline => "Tracking ball",
            PolicySource::Explore => "Exploring",
            PolicySource::Learned => "Learned policy",
        };
        vec![
            Insight::new("States learned", self.table.len().to_string()).with_confidence(coverage),
            Insight::new("Exploration", format!("{:.0}%", self.epsilon * 100.0))
                .with_confidence(1.0 - self.epsilon),
            Insight::new("Policy", policy).with_confidence(learned_share),
            Insight::new("Updates", self.updates.to_string()).with_tone(InsightTone::Neutral),
        ]
    }

    fn name(&self) -> &str {
        "Value learner"
    }
}
