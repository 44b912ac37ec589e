use crate::game::{Board, Cell, GameOutcome, GameState, Side, CENTER_COL, COLS, ROWS};

use super::agent::{Agent, Insight, InsightTone};

/// Score for a won position before the remaining-depth tie-break.
pub const WIN_SCORE: f64 = 100_000.0;

/// Column ordering: center-first for better alpha-beta pruning.
const MOVE_ORDER: [usize; COLS] = [3, 2, 4, 1, 5, 0, 6];

/// Search and heuristic parameters for the Connect Four opponent.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Depth used for a player with no recorded sessions.
    pub base_depth: usize,
    pub max_depth: usize,
    /// Recorded sessions needed for each extra ply.
    pub sessions_per_depth: u32,
    pub own_three: f64,
    pub opponent_three: f64,
    pub own_two: f64,
    pub center_bonus: f64,
    /// Weight added to a column when the player spends a whole game in it.
    pub weight_learning_rate: f64,
    pub max_column_weight: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            base_depth: 4,
            max_depth: 7,
            sessions_per_depth: 3,
            own_three: 50.0,
            opponent_three: 80.0,
            own_two: 10.0,
            center_bonus: 3.0,
            weight_learning_rate: 4.0,
            max_column_weight: 20.0,
        }
    }
}

impl SearchConfig {
    /// Search depth for a player with `played` recorded sessions.
    pub fn depth_for(&self, played: u32) -> usize {
        let extra = if self.sessions_per_depth == 0 {
            0
        } else {
            (played / self.sessions_per_depth) as usize
        };
        (self.base_depth + extra).clamp(1, self.max_depth.max(1))
    }
}

/// Learned per-column bias, accumulated from where the player drops pieces.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ColumnWeights(pub [f64; COLS]);

impl ColumnWeights {
    pub fn get(&self, col: usize) -> f64 {
        self.0[col]
    }

    /// Add `amount` to a column, keeping it within [0, max].
    fn accumulate(&mut self, col: usize, amount: f64, max: f64) {
        if amount.is_finite() && amount > 0.0 {
            self.0[col] = (self.0[col] + amount).clamp(0.0, ceiling(max));
        }
    }

    fn clamped(mut self, max: f64) -> Self {
        let max = ceiling(max);
        for w in &mut self.0 {
            *w = if w.is_finite() { w.clamp(0.0, max) } else { 0.0 };
        }
        self
    }
}

/// A weight cap that is not a positive finite number disables the bias.
fn ceiling(max: f64) -> f64 {
    if max.is_finite() && max > 0.0 {
        max
    } else {
        0.0
    }
}

/// Window-scanning evaluation from the AI's point of view.
#[derive(Debug, Clone)]
pub struct AdaptiveHeuristic {
    own_three: f64,
    opponent_three: f64,
    own_two: f64,
    center_bonus: f64,
    weights: ColumnWeights,
}

impl AdaptiveHeuristic {
    pub fn new(config: &SearchConfig, weights: ColumnWeights) -> Self {
        AdaptiveHeuristic {
            own_three: config.own_three,
            opponent_three: config.opponent_three,
            own_two: config.own_two,
            center_bonus: config.center_bonus,
            weights,
        }
    }

    fn score_window(&self, window: [Cell; 4]) -> f64 {
        let own = window.iter().filter(|&&c| c == Cell::Ai).count();
        let opp = window.iter().filter(|&&c| c == Cell::Human).count();
        let empty = 4 - own - opp;
        if own == 3 && empty == 1 {
            self.own_three
        } else if opp == 3 && empty == 1 {
            -self.opponent_three
        } else if own == 2 && empty == 2 {
            self.own_two
        } else {
            0.0
        }
    }

    /// Pure function of the board: identical boards always score the same.
    pub fn evaluate(&self, board: &Board) -> f64 {
        let mut score = 0.0;

        // Center column bonus
        for row in 0..ROWS {
            match board.get(row, CENTER_COL) {
                Cell::Ai => score += self.center_bonus,
                Cell::Human => score -= self.center_bonus,
                Cell::Empty => {}
            }
        }

        score += board.windows().map(|w| self.score_window(w)).sum::<f64>();

        // Contest the columns the player has favored in the past
        for col in 0..COLS {
            let own = board.count_in_column(col, Cell::Ai);
            score += self.weights.get(col) * own as f64;
        }

        score
    }
}

/// Result of one root search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchReport {
    pub column: usize,
    pub score: f64,
    pub depth: usize,
    pub nodes: u64,
}

/// What the Connect Four session reports back to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFeedback {
    /// The human dropped a piece. `opening` is set for their first move of a game.
    OpponentMoved { column: usize, opening: bool },
    GameEnded(GameOutcome),
}

/// Coarse numbers exported to the profile at session end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSummary {
    pub column_weights: ColumnWeights,
    pub column_usage: [u32; COLS],
    pub openings: [u32; COLS],
    pub depth: usize,
}

/// Minimax opponent whose evaluation drifts toward the player's columns.
pub struct AdaptiveSearchAgent {
    config: SearchConfig,
    depth: usize,
    heuristic: AdaptiveHeuristic,
    game_usage: [u32; COLS],
    game_opening: Option<usize>,
    session_usage: [u32; COLS],
    session_openings: [u32; COLS],
    games_folded: u32,
    last_report: Option<SearchReport>,
}

impl AdaptiveSearchAgent {
    /// Create an agent for a player with `played` recorded sessions and
    /// previously learned column weights.
    pub fn new(config: SearchConfig, played: u32, weights: ColumnWeights) -> Self {
        let depth = config.depth_for(played);
        let weights = weights.clamped(config.max_column_weight);
        let heuristic = AdaptiveHeuristic::new(&config, weights);
        AdaptiveSearchAgent {
            config,
            depth,
            heuristic,
            game_usage: [0; COLS],
            game_opening: None,
            session_usage: [0; COLS],
            session_openings: [0; COLS],
            games_folded: 0,
            last_report: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn column_weights(&self) -> ColumnWeights {
        self.heuristic.weights
    }

    pub fn last_report(&self) -> Option<SearchReport> {
        self.last_report
    }

    /// Static evaluation of a board from the AI's point of view.
    pub fn evaluate(&self, board: &Board) -> f64 {
        self.heuristic.evaluate(board)
    }

    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            column_weights: self.heuristic.weights,
            column_usage: self.session_usage,
            openings: self.session_openings,
            depth: self.depth,
        }
    }

    /// Alpha-beta search for the AI's best column. Returns `None` when no
    /// column is playable. `board` is left exactly as it was passed in.
    pub fn alpha_beta(&self, board: &mut Board, depth: usize) -> Option<SearchReport> {
        self.root(board, depth, true)
    }

    /// Exhaustive minimax at the same depth and move order as `alpha_beta`.
    pub fn minimax(&self, board: &mut Board, depth: usize) -> Option<SearchReport> {
        self.root(board, depth, false)
    }

    /// Score of each playable column at `depth` without pruning.
    pub fn column_scores(&self, board: &mut Board, depth: usize) -> Vec<(usize, f64)> {
        let depth = depth.max(1);
        let mut nodes = 0;
        MOVE_ORDER
            .iter()
            .filter_map(|&col| {
                board
                    .with_move(col, Cell::Ai, |b, row| {
                        self.child_value(b, row, col, Side::Ai, depth, f64::NEG_INFINITY, f64::INFINITY, false, &mut nodes)
                    })
                    .ok()
                    .map(|score| (col, score))
            })
            .collect()
    }

    fn root(&self, board: &mut Board, depth: usize, prune: bool) -> Option<SearchReport> {
        let depth = depth.max(1);
        let mut nodes = 0u64;
        let mut best: Option<(usize, f64)> = None;
        let mut alpha = f64::NEG_INFINITY;

        for &col in &MOVE_ORDER {
            let score = match board.with_move(col, Cell::Ai, |b, row| {
                self.child_value(b, row, col, Side::Ai, depth, alpha, f64::INFINITY, prune, &mut nodes)
            }) {
                Ok(score) => score,
                Err(_) => continue,
            };
            // Strict comparison keeps the first best column in move order,
            // which is what makes pruned and unpruned search agree.
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((col, score));
            }
            if prune {
                if let Some((_, best_score)) = best {
                    alpha = alpha.max(best_score);
                }
            }
        }

        best.map(|(column, score)| SearchReport {
            column,
            score,
            depth,
            nodes,
        })
    }

    /// Value of the position right after `mover` dropped into (row, col),
    /// with `depth` plies still budgeted at the parent.
    #[allow(clippy::too_many_arguments)]
    fn child_value(
        &self,
        board: &mut Board,
        row: usize,
        col: usize,
        mover: Side,
        depth: usize,
        alpha: f64,
        beta: f64,
        prune: bool,
        nodes: &mut u64,
    ) -> f64 {
        let remaining = (depth - 1) as f64;
        if board.check_win(row, col) {
            return match mover {
                Side::Ai => WIN_SCORE + remaining,
                Side::Human => -WIN_SCORE - remaining,
            };
        }
        if board.is_full() {
            return 0.0;
        }
        self.search(board, depth - 1, mover.other(), alpha, beta, prune, nodes)
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        board: &mut Board,
        depth: usize,
        to_move: Side,
        mut alpha: f64,
        mut beta: f64,
        prune: bool,
        nodes: &mut u64,
    ) -> f64 {
        *nodes += 1;
        if depth == 0 {
            return self.heuristic.evaluate(board);
        }

        let maximizing = to_move == Side::Ai;
        let mut best = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };

        for &col in &MOVE_ORDER {
            let score = match board.with_move(col, to_move.to_cell(), |b, row| {
                self.child_value(b, row, col, to_move, depth, alpha, beta, prune, nodes)
            }) {
                Ok(score) => score,
                Err(_) => continue,
            };

            if maximizing {
                best = best.max(score);
                alpha = alpha.max(best);
            } else {
                best = best.min(score);
                beta = beta.min(best);
            }
            if prune && alpha >= beta {
                break;
            }
        }

        best
    }

    /// Fold the finished game's column usage into the learned weights.
    fn fold_game(&mut self) {
        let total: u32 = self.game_usage.iter().sum();
        if total == 0 && self.game_opening.is_none() {
            return;
        }
        let rate = self.config.weight_learning_rate;
        let max = self.config.max_column_weight;
        for col in 0..COLS {
            let usage_share = if total == 0 {
                0.0
            } else {
                f64::from(self.game_usage[col]) / f64::from(total)
            };
            let opened = if self.game_opening == Some(col) { 1.0 } else { 0.0 };
            self.heuristic
                .weights
                .accumulate(col, rate * 0.5 * (usage_share + opened), max);
        }
        self.game_usage = [0; COLS];
        self.game_opening = None;
        self.games_folded += 1;
    }

    fn favorite_column(&self) -> Option<(usize, f64)> {
        let total: u32 = self.session_usage.iter().sum();
        if total == 0 {
            return None;
        }
        let (col, count) = self
            .session_usage
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
        Some((col, f64::from(*count) / f64::from(total)))
    }
}

impl Agent for AdaptiveSearchAgent {
    type Observation = GameState;
    type Action = usize;
    type Outcome = SearchFeedback;

    fn decide(&mut self, state: &GameState) -> usize {
        let mut board = *state.board();
        match self.alpha_beta(&mut board, self.depth) {
            Some(report) => {
                self.last_report = Some(report);
                report.column
            }
            None => CENTER_COL,
        }
    }

    fn observe(&mut self, feedback: SearchFeedback) {
        match feedback {
            SearchFeedback::OpponentMoved { column, opening } => {
                if column >= COLS {
                    return;
                }
                self.game_usage[column] += 1;
                self.session_usage[column] += 1;
                if opening {
                    self.game_opening = Some(column);
                    self.session_openings[column] += 1;
                }
            }
            SearchFeedback::GameEnded(_) => self.fold_game(),
        }
    }

    fn insights(&self) -> Vec<Insight> {
        let mut insights = vec![
            Insight::new("Search depth", format!("{} ply", self.depth))
                .with_tone(InsightTone::Neutral),
            Insight::new("Games studied", self.games_folded.to_string()),
        ];

        match self.favorite_column() {
            Some((col, share)) => insights.push(
                Insight::new("Your favorite column", (col + 1).to_string())
                    .with_confidence(share),
            ),
            None => insights.push(Insight::new("Your favorite column", "watching")),
        }

        let weights = self.heuristic.weights;
        let (bias_col, bias) = (0..COLS)
            .map(|c| (c, weights.get(c)))
            .fold((CENTER_COL, 0.0), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if bias > 0.0 {
            insights.push(
                Insight::new("Contesting column", (bias_col + 1).to_string())
                    .with_confidence(bias / self.config.max_column_weight),
            );
        }

        if let Some(report) = self.last_report {
            let verdict = if report.score >= WIN_SCORE {
                "Winning line found".to_string()
            } else if report.score <= -WIN_SCORE {
                "Expecting to lose".to_string()
            } else {
                format!("{:+.0}", report.score)
            };
            insights.push(Insight::new(
                "Last search",
                format!("{verdict} ({} nodes)", report.nodes),
            ));
        }

        insights
    }

    fn name(&self) -> &str {
        "Adaptive search"
    }
}
