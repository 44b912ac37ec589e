//! Dodge: the player steers around projectiles aimed by the spatial
//! targeter. Surviving the clock wins; running out of lives loses.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{Agent, Insight, SpatialTargeter, TargetStrategy, TargeterConfig, Vec2};
use crate::arena::scheduler::Scheduler;
use crate::arena::{session_rng, GameSession, GameView, InputStatus, PlayerInput, SessionSummary};
use crate::profile::{GameId, GameResult, GameStats, PatternSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DodgeConfig {
    pub width: f64,
    pub height: f64,
    pub player_speed: f64,
    pub projectile_speed: f64,
    pub spawn_interval_ticks: u64,
    pub hit_radius: f64,
    pub lives: u32,
    pub duration_ticks: u64,
    pub targeter: TargeterConfig,
}

impl Default for DodgeConfig {
    fn default() -> Self {
        DodgeConfig {
            width: 120.0,
            height: 80.0,
            player_speed: 2.0,
            projectile_speed: 3.0,
            spawn_interval_ticks: 24,
            hit_radius: 4.0,
            lives: 3,
            duration_ticks: 1500,
            targeter: TargeterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub position: Vec2,
    pub velocity: Vec2,
    pub strategy: TargetStrategy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DodgeView {
    pub field: Vec2,
    pub player: Vec2,
    pub projectiles: Vec<Projectile>,
    pub lives: u32,
    pub ticks_left: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DodgeEvent {
    Spawn,
}

pub struct DodgeSession {
    config: DodgeConfig,
    seed: Option<u64>,
    targeter: SpatialTargeter,
    rng: StdRng,
    scheduler: Scheduler<DodgeEvent>,
    player: Vec2,
    projectiles: Vec<Projectile>,
    lives: u32,
    hits: u32,
    spawned: u32,
    running: bool,
    finished: bool,
    ticks: u64,
}

impl DodgeSession {
    pub fn new(config: DodgeConfig, seed: Option<u64>) -> Self {
        let field = Vec2::new(config.width, config.height);
        let targeter = match seed {
            Some(seed) => SpatialTargeter::with_seed(config.targeter.clone(), field, seed),
            None => SpatialTargeter::new(config.targeter.clone(), field),
        };
        DodgeSession {
            player: field * 0.5,
            lives: config.lives,
            config,
            seed,
            targeter,
            rng: session_rng(seed.map(|s| s.rotate_left(17))),
            scheduler: Scheduler::new(),
            projectiles: Vec::new(),
            hits: 0,
            spawned: 0,
            running: false,
            finished: false,
            ticks: 0,
        }
    }

    pub fn targeter(&self) -> &SpatialTargeter {
        &self.targeter
    }

    pub fn hits(&self) -> u32 {
        self.hits
    }

    fn field(&self) -> Vec2 {
        Vec2::new(self.config.width, self.config.height)
    }

    fn steer(&mut self, direction: Vec2) -> InputStatus {
        if !direction.is_finite() {
            return InputStatus::Invalid;
        }
        let len = direction.length();
        let step = if len > 1.0 { direction * (1.0 / len) } else { direction };
        self.player = (self.player + step * self.config.player_speed).clamp_to(self.field());
        InputStatus::Accepted
    }

    /// A point on a random edge of the field.
    fn edge_point(&mut self) -> Vec2 {
        let (w, h) = (self.config.width, self.config.height);
        match self.rng.random_range(0..4) {
            0 => Vec2::new(self.rng.random_range(0.0..=w), 0.0),
            1 => Vec2::new(self.rng.random_range(0.0..=w), h),
            2 => Vec2::new(0.0, self.rng.random_range(0.0..=h)),
            _ => Vec2::new(w, self.rng.random_range(0.0..=h)),
        }
    }

    fn spawn(&mut self) {
        let target = self.targeter.decide(&self.player);
        let origin = self.edge_point();
        let heading = target.point - origin;
        let len = heading.length();
        let velocity = if len > f64::EPSILON {
            heading * (self.config.projectile_speed / len)
        } else {
            (self.field() * 0.5 - origin) * (self.config.projectile_speed / self.field().length())
        };
        self.projectiles.push(Projectile {
            position: origin,
            velocity,
            strategy: target.strategy,
        });
        self.spawned += 1;
        self.scheduler
            .schedule(self.config.spawn_interval_ticks, DodgeEvent::Spawn);
    }

    fn step_projectiles(&mut self) {
        let field = self.field();
        let margin = self.config.hit_radius * 2.0;
        let player = self.player;
        let radius = self.config.hit_radius;

        let mut hits = 0;
        self.projectiles.retain_mut(|p| {
            p.position = p.position + p.velocity;
            if (p.position - player).length() <= radius {
                hits += 1;
                return false;
            }
            p.position.x >= -margin
                && p.position.x <= field.x + margin
                && p.position.y >= -margin
                && p.position.y <= field.y + margin
        });

        if hits > 0 {
            self.hits += hits;
            self.lives = self.lives.saturating_sub(hits);
            log::debug!("player hit, {} lives left", self.lives);
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.running = false;
        self.projectiles.clear();
        self.scheduler.cancel_all();
    }

    fn patterns(&self) -> Vec<String> {
        let summary = self.targeter.summary();
        let mut tags = Vec::new();
        if summary.samples < 60 {
            return tags;
        }
        if summary.edge_share >= 0.5 {
            tags.push("Hugs edges".to_string());
        }
        if summary.hotspot_confidence >= 0.25 {
            if let Some(hot) = self.targeter.hotspot() {
                tags.push(format!("Camps near the {}", self.targeter.zone_of(hot)));
            }
        }
        if summary.mean_speed < 0.3 * self.config.player_speed {
            tags.push("Stands still".to_string());
        } else if summary.mean_speed > 0.8 * self.config.player_speed {
            tags.push("Keeps moving".to_string());
        }
        tags
    }
}

impl GameSession for DodgeSession {
    fn game_id(&self) -> GameId {
        GameId::Dodge
    }

    fn start(&mut self, stats: &GameStats) {
        *self = DodgeSession::new(self.config.clone(), self.seed);
        if let Some(PatternSummary::Dodge {
            hotspot: Some((x, y)),
            ..
        }) = stats.last_summary
        {
            self.targeter.seed_prior(Vec2::new(x, y));
        }
        self.running = true;
        self.scheduler
            .schedule(self.config.spawn_interval_ticks, DodgeEvent::Spawn);
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

        let status = match input {
            PlayerInput::Steer(direction) => self.steer(direction),
            PlayerInput::None => InputStatus::Idle,
            _ => InputStatus::Invalid,
        };
        self.targeter.observe(self.player);

        for event in self.scheduler.advance() {
            match event {
                DodgeEvent::Spawn => self.spawn(),
            }
        }
        self.step_projectiles();

        if self.lives == 0 || self.ticks >= self.config.duration_ticks {
            self.finish();
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
        GameView::Dodge(DodgeView {
            field: self.field(),
            player: self.player,
            projectiles: self.projectiles.clone(),
            lives: self.lives,
            ticks_left: self.config.duration_ticks.saturating_sub(self.ticks),
        })
    }

    fn insights(&self) -> Vec<Insight> {
        let mut insights = self.targeter.insights();
        if self.spawned > 0 {
            insights.push(Insight::new(
                "Hits landed",
                format!("{} of {}", self.hits, self.spawned),
            ));
        }
        insights
    }

    fn summary(&self) -> SessionSummary {
        let result = self.finished.then(|| {
            if self.lives > 0 {
                GameResult::Win
            } else {
                GameResult::Loss
            }
        });
        let learned = self.targeter.summary();
        SessionSummary {
            game: GameId::Dodge,
            result,
            patterns: self.patterns(),
            pattern_summary: PatternSummary::Dodge {
                hotspot: learned.hotspot.map(|h| (h.x, h.y)),
                hotspot_confidence: learned.hotspot_confidence,
                edge_share: learned.edge_share,
                samples: learned.samples,
            },
            ticks: self.ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(config: DodgeConfig) -> DodgeSession {
        let mut session = DodgeSession::new(config, Some(21));
        session.start(&GameStats::default());
        session
    }

    #[test]
    fn test_steering_is_normalized_and_clamped() {
        let config = DodgeConfig {
            spawn_interval_ticks: 10_000,
            ..Default::default()
        };
        let mut session = started(config);
        let status = session.tick(PlayerInput::Steer(Vec2::new(10.0, 0.0)));
        assert_eq!(status, InputStatus::Accepted);
        assert_eq!(session.player, Vec2::new(62.0, 40.0));
        for _ in 0..100 {
            session.tick(PlayerInput::Steer(Vec2::new(-1.0, -1.0)));
        }
        assert_eq!(session.player, Vec2::new(0.0, 0.0));
        assert_eq!(
            session.tick(PlayerInput::Steer(Vec2::new(f64::NAN, 0.0))),
            InputStatus::Invalid
        );
        assert_eq!(session.tick(PlayerInput::Flip(0)), InputStatus::Invalid);
    }

    #[test]
    fn test_projectiles_spawn_on_schedule() {
        let mut session = started(DodgeConfig::default());
        for _ in 0..23 {
            session.tick(PlayerInput::None);
        }
        assert!(session.projectiles.is_empty());
        session.tick(PlayerInput::None);
        assert_eq!(session.spawned, 1);
    }

    #[test]
    fn test_survivor_wins_when_clock_runs_out() {
        let config = DodgeConfig {
            duration_ticks: 50,
            spawn_interval_ticks: 1000,
            ..Default::default()
        };
        let mut session = started(config);
        for _ in 0..50 {
            session.tick(PlayerInput::None);
        }
        assert!(session.is_finished());
        assert_eq!(session.summary().result, Some(GameResult::Win));
    }

    #[test]
    fn test_standing_still_gets_hit_and_tagged() {
        let config = DodgeConfig {
            lives: 12,
            duration_ticks: 5000,
            spawn_interval_ticks: 8,
            ..Default::default()
        };
        let mut session = started(config);
        for _ in 0..5000 {
            if session.is_finished() {
                break;
            }
            session.tick(PlayerInput::None);
        }
        assert!(session.is_finished());
        let summary = session.summary();
        assert_eq!(summary.result, Some(GameResult::Loss));
        assert!(summary.patterns.contains(&"Stands still".to_string()));
        assert!(summary.patterns.iter().any(|t| t.starts_with("Camps near the")));
    }

    #[test]
    fn test_prior_hotspot_seeds_targeter() {
        let stats = GameStats {
            last_summary: Some(PatternSummary::Dodge {
                hotspot: Some((0.95, 0.05)),
                hotspot_confidence: 0.6,
                edge_share: 0.9,
                samples: 900,
            }),
            ..Default::default()
        };
        let mut session = DodgeSession::new(DodgeConfig::default(), Some(5));
        session.start(&stats);
        let hot = session.targeter().hotspot().unwrap();
        assert!(hot.x > 100.0 && hot.y < 10.0);
        assert_eq!(session.targeter().samples(), 0);
    }
}
