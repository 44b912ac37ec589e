use std::path::{Path, PathBuf};

use crate::arena::{ConnectFourConfig, DodgeConfig, MemoryConfig, PongConfig, RpsConfig};
use crate::error::ConfigError;

/// Settings shared by every session the arena runs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Hard cap on ticks for a headless session.
    pub max_ticks: u64,
    /// Fixed seed for reproducible runs; each new session uses the next value.
    pub seed: Option<u64>,
    pub profile_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_ticks: 20_000,
            seed: None,
            profile_path: PathBuf::from("profile.json"),
        }
    }
}

/// Top-level arena configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub session: SessionConfig,
    pub pong: PongConfig,
    pub connect_four: ConnectFourConfig,
    pub rps: RpsConfig,
    pub dodge: DodgeConfig,
    pub memory: MemoryConfig,
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(message.into()))
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

// Written as range checks so NaN never satisfies them.
fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl ArenaConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: ArenaConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.max_ticks == 0 {
            return invalid("session.max_ticks must be > 0");
        }

        let pong = &self.pong;
        if !positive(pong.width) || !positive(pong.height) {
            return invalid("pong.width and pong.height must be > 0");
        }
        if !(positive(pong.paddle_height) && pong.paddle_height < pong.height) {
            return invalid("pong.paddle_height must be in (0, pong.height)");
        }
        if !positive(pong.paddle_speed) {
            return invalid("pong.paddle_speed must be > 0");
        }
        if !(positive(pong.ball_speed) && pong.max_ball_speed.is_finite())
            || pong.max_ball_speed < pong.ball_speed
        {
            return invalid("pong.max_ball_speed must be >= pong.ball_speed > 0");
        }
        if !(pong.speedup.is_finite() && pong.speedup >= 1.0) || !non_negative(pong.spin) {
            return invalid("pong.speedup must be >= 1 and pong.spin >= 0");
        }
        if pong.points_to_win == 0 {
            return invalid("pong.points_to_win must be > 0");
        }
        let learner = &pong.learner;
        if !(learner.alpha > 0.0 && learner.alpha <= 1.0) {
            return invalid("pong.learner.alpha must be in (0, 1]");
        }
        if !unit_interval(learner.gamma) {
            return invalid("pong.learner.gamma must be in [0, 1]");
        }
        if !unit_interval(learner.epsilon_start) || !unit_interval(learner.epsilon_floor) {
            return invalid("pong.learner epsilon bounds must be in [0, 1]");
        }
        if learner.epsilon_floor > learner.epsilon_start {
            return invalid("pong.learner.epsilon_floor must be <= epsilon_start");
        }
        if !(learner.epsilon_decay > 0.0 && learner.epsilon_decay <= 1.0) {
            return invalid("pong.learner.epsilon_decay must be in (0, 1]");
        }
        if !non_negative(learner.lookahead_ticks) || !non_negative(learner.dead_zone) {
            return invalid("pong.learner.lookahead_ticks and dead_zone must be >= 0");
        }
        if learner.x_bins == 0 || learner.y_bins == 0 || learner.paddle_bins == 0 {
            return invalid("pong.learner bins must be > 0");
        }

        let search = &self.connect_four.search;
        if search.base_depth == 0 || search.max_depth < search.base_depth {
            return invalid("connect_four.search depths must satisfy 1 <= base_depth <= max_depth");
        }
        if !non_negative(search.max_column_weight) || !non_negative(search.weight_learning_rate) {
            return invalid("connect_four.search weights must be >= 0");
        }
        let heuristic = [
            search.own_three,
            search.opponent_three,
            search.own_two,
            search.center_bonus,
        ];
        if !heuristic.into_iter().all(non_negative) {
            return invalid("connect_four.search heuristic scores must be >= 0");
        }

        let rps = &self.rps;
        if rps.rounds == 0 {
            return invalid("rps.rounds must be > 0");
        }
        if rps.predictor.max_order == 0 {
            return invalid("rps.predictor.max_order must be >= 1");
        }
        if rps.predictor.choice_labels.len() != crate::arena::rps::CHOICES {
            return invalid("rps.predictor.choice_labels must name exactly 3 throws");
        }
        if !non_negative(rps.predictor.order_weight) {
            return invalid("rps.predictor.order_weight must be >= 0");
        }

        let dodge = &self.dodge;
        if !positive(dodge.width) || !positive(dodge.height) {
            return invalid("dodge.width and dodge.height must be > 0");
        }
        if !positive(dodge.player_speed)
            || !positive(dodge.projectile_speed)
            || !positive(dodge.hit_radius)
        {
            return invalid("dodge speeds and hit_radius must be > 0");
        }
        if dodge.lives == 0 || dodge.duration_ticks == 0 {
            return invalid("dodge.lives and dodge.duration_ticks must be > 0");
        }
        if dodge.spawn_interval_ticks == 0 {
            return invalid("dodge.spawn_interval_ticks must be > 0");
        }
        if dodge.targeter.grid_cols == 0 || dodge.targeter.grid_rows == 0 {
            return invalid("dodge.targeter grid must have at least one cell");
        }
        let targeter = &dodge.targeter;
        if !non_negative(targeter.lookahead_ticks)
            || !non_negative(targeter.predicted_jitter)
            || !non_negative(targeter.hotspot_jitter)
        {
            return invalid("dodge.targeter lookahead and jitter must be >= 0");
        }

        let memory = &self.memory;
        if memory.rounds == 0 {
            return invalid("memory.rounds must be > 0");
        }
        if !unit_interval(memory.win_efficiency) {
            return invalid("memory.win_efficiency must be in [0, 1]");
        }
        let recall = &memory.recall;
        if recall.base_pairs == 0 {
            return invalid("memory.recall.base_pairs must be > 0");
        }
        if !unit_interval(recall.smoothing) {
            return invalid("memory.recall.smoothing must be in [0, 1]");
        }
        let thresholds = [recall.initial_score, recall.promote_base, recall.demote_base];
        if !thresholds.into_iter().all(f64::is_finite) {
            return invalid("memory.recall scores must be finite");
        }
        if !non_negative(recall.promote_step) || !non_negative(recall.demote_step) {
            return invalid("memory.recall steps must be >= 0");
        }
        if recall.demote_base >= recall.promote_base {
            return invalid("memory.recall.demote_base must be < promote_base");
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        toml::to_string_pretty(&ArenaConfig::default())
            .map_err(|e| ConfigError::Validation(format!("default config does not serialize: {e}")))
    }
}
