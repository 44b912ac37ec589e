//! Paddle duel against the value-learning agent. The human defends the left
//! edge, the agent the right.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{Agent, CourtView, Insight, PaddleMove, Reward, ValueLearningAgent, ValueLearningConfig, Vec2};
use crate::arena::scheduler::Scheduler;
use crate::arena::{session_rng, GameSession, GameView, InputStatus, PlayerInput, SessionSummary};
use crate::profile::{GameId, GameResult, GameStats, PatternSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PongConfig {
    pub width: f64,
    pub height: f64,
    pub paddle_height: f64,
    pub paddle_speed: f64,
    pub ball_speed: f64,
    pub max_ball_speed: f64,
    /// Horizontal speed multiplier applied on every return.
    pub speedup: f64,
    /// Vertical speed added per unit of off-center contact.
    pub spin: f64,
    pub points_to_win: u32,
    pub serve_delay_ticks: u64,
    pub learner: ValueLearningConfig,
}

impl Default for PongConfig {
    fn default() -> Self {
        PongConfig {
            width: 160.0,
            height: 100.0,
            paddle_height: 20.0,
            paddle_speed: 3.0,
            ball_speed: 2.5,
            max_ball_speed: 5.0,
            speedup: 1.05,
            spin: 1.5,
            points_to_win: 5,
            serve_delay_ticks: 30,
            learner: ValueLearningConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PongView {
    pub field: Vec2,
    pub ball: Vec2,
    pub ball_velocity: Vec2,
    pub in_play: bool,
    pub human_paddle: f64,
    pub ai_paddle: f64,
    pub paddle_height: f64,
    pub human_score: u32,
    pub ai_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PongEvent {
    /// Launch the ball; `toward_human` picks the direction.
    Serve { toward_human: bool },
}

pub struct PongSession {
    config: PongConfig,
    seed: Option<u64>,
    agent: ValueLearningAgent,
    rng: StdRng,
    scheduler: Scheduler<PongEvent>,
    ball: Vec2,
    velocity: Vec2,
    in_play: bool,
    human_y: f64,
    ai_y: f64,
    human_score: u32,
    ai_score: u32,
    running: bool,
    finished: bool,
    ticks: u64,
    returns_up: u32,
    returns_down: u32,
    human_offset_sum: f64,
    human_samples: u64,
}

impl PongSession {
    pub fn new(config: PongConfig, seed: Option<u64>) -> Self {
        let agent = Self::build_agent(&config, seed);
        let center = config.height / 2.0;
        PongSession {
            ball: Vec2::new(config.width / 2.0, center),
            config,
            seed,
            agent,
            rng: session_rng(seed),
            scheduler: Scheduler::new(),
            velocity: Vec2::default(),
            in_play: false,
            human_y: center,
            ai_y: center,
            human_score: 0,
            ai_score: 0,
            running: false,
            finished: false,
            ticks: 0,
            returns_up: 0,
            returns_down: 0,
            human_offset_sum: 0.0,
            human_samples: 0,
        }
    }

    fn build_agent(config: &PongConfig, seed: Option<u64>) -> ValueLearningAgent {
        match seed {
            Some(seed) => ValueLearningAgent::with_seed(config.learner.clone(), seed),
            None => ValueLearningAgent::new(config.learner.clone()),
        }
    }

    pub fn agent(&self) -> &ValueLearningAgent {
        &self.agent
    }

    fn court_view(&self) -> CourtView {
        CourtView {
            ball_x: self.ball.x,
            ball_y: self.ball.y,
            ball_vx: self.velocity.x,
            ball_vy: self.velocity.y,
            paddle_y: self.ai_y,
            width: self.config.width,
            height: self.config.height,
        }
    }

    fn move_paddle(&self, y: f64, action: PaddleMove) -> f64 {
        let half = self.config.paddle_height / 2.0;
        (y + action.direction() * self.config.paddle_speed).clamp(half, self.config.height - half)
    }

    fn reset_ball(&mut self, toward_human: bool) {
        self.ball = Vec2::new(self.config.width / 2.0, self.config.height / 2.0);
        self.velocity = Vec2::default();
        self.in_play = false;
        self.scheduler
            .schedule(self.config.serve_delay_ticks, PongEvent::Serve { toward_human });
    }

    fn serve(&mut self, toward_human: bool) {
        let speed = self.config.ball_speed;
        let vx = if toward_human { -speed } else { speed };
        let vy = self.rng.random_range(-0.5..=0.5) * speed;
        self.velocity = Vec2::new(vx, vy);
        self.in_play = true;
    }

    /// Return the ball off a paddle centered at `paddle_y`, adding spin by
    /// how far from center it struck.
    fn deflect(&mut self, paddle_y: f64, heading_right: bool) {
        let half = self.config.paddle_height / 2.0;
        let offset = ((self.ball.y - paddle_y) / half).clamp(-1.0, 1.0);
        let vx = (self.velocity.x.abs() * self.config.speedup).min(self.config.max_ball_speed);
        self.velocity.x = if heading_right { vx } else { -vx };
        self.velocity.y = (self.velocity.y + offset * self.config.spin)
            .clamp(-self.config.max_ball_speed, self.config.max_ball_speed);
    }

    fn reaches(&self, paddle_y: f64) -> bool {
        (self.ball.y - paddle_y).abs() <= self.config.paddle_height / 2.0 + 1.0
    }

    fn point_to(&mut self, human: bool) {
        if human {
            self.human_score += 1;
            self.agent.observe(Reward::Conceded);
        } else {
            self.ai_score += 1;
            self.agent.observe(Reward::Scored);
        }
        log::debug!("point: {} - {}", self.human_score, self.ai_score);

        let target = self.config.points_to_win;
        if self.human_score >= target || self.ai_score >= target {
            self.finish();
        } else {
            // Serve toward whoever just conceded.
            self.reset_ball(!human);
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.running = false;
        self.in_play = false;
        self.agent.end_episode();
        self.scheduler.cancel_all();
    }

    fn step_ball(&mut self) {
        self.ball = self.ball + self.velocity;

        let h = self.config.height;
        if self.ball.y < 0.0 {
            self.ball.y = -self.ball.y;
            self.velocity.y = self.velocity.y.abs();
        } else if self.ball.y > h {
            self.ball.y = 2.0 * h - self.ball.y;
            self.velocity.y = -self.velocity.y.abs();
        }

        let w = self.config.width;
        if self.ball.x >= w {
            if self.reaches(self.ai_y) {
                self.ball.x = 2.0 * w - self.ball.x;
                self.deflect(self.ai_y, false);
                self.agent.observe(Reward::Hit);
            } else {
                self.point_to(true);
            }
        } else if self.ball.x <= 0.0 {
            if self.reaches(self.human_y) {
                self.ball.x = -self.ball.x;
                self.deflect(self.human_y, true);
                if self.velocity.y < -0.5 {
                    self.returns_up += 1;
                } else if self.velocity.y > 0.5 {
                    self.returns_down += 1;
                }
            } else {
                self.point_to(false);
            }
        }
    }

    fn high_return_share(&self) -> f64 {
        let total = self.returns_up + self.returns_down;
        if total == 0 {
            0.0
        } else {
            f64::from(self.returns_up) / f64::from(total)
        }
    }

    fn patterns(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if self.returns_up + self.returns_down >= 5 {
            let high = self.high_return_share();
            if high >= 0.6 {
                tags.push("Aims high".to_string());
            } else if high <= 0.4 {
                tags.push("Aims low".to_string());
            }
        }
        if self.human_samples >= 100 {
            let mean_offset = self.human_offset_sum / self.human_samples as f64;
            if mean_offset < self.config.height * 0.15 {
                tags.push("Hugs the middle".to_string());
            }
        }
        tags
    }
}

impl GameSession for PongSession {
    fn game_id(&self) -> GameId {
        GameId::Pong
    }

    fn start(&mut self, stats: &GameStats) {
        let mut fresh = PongSession::new(self.config.clone(), self.seed);
        if let Some(PatternSummary::Pong { epsilon, .. }) = stats.last_summary {
            fresh.agent.resume_epsilon(epsilon);
        }
        *self = fresh;
        self.running = true;
        let toward_human = self.rng.random_bool(0.5);
        self.reset_ball(toward_human);
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
                PongEvent::Serve { toward_human } => self.serve(toward_human),
            }
        }

        let status = match input {
            PlayerInput::Paddle(action) => {
                self.human_y = self.move_paddle(self.human_y, action);
                InputStatus::Accepted
            }
            PlayerInput::None => InputStatus::Idle,
            _ => InputStatus::Invalid,
        };
        self.human_offset_sum += (self.human_y - self.config.height / 2.0).abs();
        self.human_samples += 1;

        let view = self.court_view();
        let action = self.agent.decide(&view);
        self.ai_y = self.move_paddle(self.ai_y, action);

        if self.in_play {
            self.step_ball();
        }
        status
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn view(&self) -> GameView {
        GameView::Pong(PongView {
            field: Vec2::new(self.config.width, self.config.height),
            ball: self.ball,
            ball_velocity: self.velocity,
            in_play: self.in_play,
            human_paddle: self.human_y,
            ai_paddle: self.ai_y,
            paddle_height: self.config.paddle_height,
            human_score: self.human_score,
            ai_score: self.ai_score,
        })
    }

    fn insights(&self) -> Vec<Insight> {
        self.agent.insights()
    }

    fn summary(&self) -> SessionSummary {
        let learned = self.agent.summary();
        let result = self.finished.then(|| {
            if self.human_score > self.ai_score {
                GameResult::Win
            } else {
                GameResult::Loss
            }
        });
        SessionSummary {
            game: GameId::Pong,
            result,
            patterns: self.patterns(),
            pattern_summary: PatternSummary::Pong {
                table_size: learned.table_size,
                epsilon: learned.epsilon,
                updates: learned.updates,
                high_returns: self.high_return_share(),
            },
            ticks: self.ticks,
        }
    }
}
