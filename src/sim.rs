//! Scripted players with deliberate habits. They stand in for a human in the
//! headless runner and the integration tests, so the adaptive opponents have
//! something real to learn.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::ai::{Insight, PaddleMove, Vec2};
use crate::arena::{
    session_rng, Arena, CardFace, ConnectFourView, DodgeView, GameView, MemoryView, PlayerInput,
    PongView, RpsView, SessionSummary,
};
use crate::game::{Side, CENTER_COL};
use crate::profile::{GameId, ProfileStore};

/// Produces one tick of input from what the player can see.
pub trait Autopilot {
    fn next_input(&mut self, view: &GameView) -> PlayerInput;
}

/// Tracks the ball, striking it off-center so returns drift one way.
pub struct PongAutopilot {
    /// Paddle offset below the ball; positive sends returns upward.
    pub aim: f64,
    pub slack: f64,
}

impl Default for PongAutopilot {
    fn default() -> Self {
        PongAutopilot { aim: 6.0, slack: 1.5 }
    }
}

impl PongAutopilot {
    fn play(&self, view: &PongView) -> PlayerInput {
        let target = if view.in_play && view.ball_velocity.x < 0.0 {
            view.ball.y + self.aim
        } else {
            view.field.y / 2.0
        };
        let delta = target - view.human_paddle;
        let action = if delta > self.slack {
            PaddleMove::Down
        } else if delta < -self.slack {
            PaddleMove::Up
        } else {
            PaddleMove::Stay
        };
        PlayerInput::Paddle(action)
    }
}

/// Opens in the center, then leans on one column.
pub struct ConnectFourAutopilot {
    pub favorite: usize,
    /// Chance of playing the favorite whenever it is open.
    pub loyalty: f64,
    rng: StdRng,
}

impl ConnectFourAutopilot {
    pub fn new(favorite: usize, loyalty: f64, seed: Option<u64>) -> Self {
        ConnectFourAutopilot {
            favorite,
            loyalty,
            rng: session_rng(seed),
        }
    }

    fn play(&mut self, view: &ConnectFourView) -> PlayerInput {
        if view.outcome.is_some() || view.ai_thinking || view.to_move != Side::Human {
            return PlayerInput::None;
        }
        let opening = view.board.piece_count() == 0;
        let preferred = if opening { CENTER_COL } else { self.favorite };
        if view.legal_columns.contains(&preferred) && self.rng.random_bool(self.loyalty) {
            return PlayerInput::Column(preferred);
        }
        match view.legal_columns.choose(&mut self.rng) {
            Some(&column) => PlayerInput::Column(column),
            None => PlayerInput::None,
        }
    }
}

/// Throws a fixed cycle, occasionally breaking it.
pub struct RpsAutopilot {
    pub pattern: Vec<usize>,
    pub noise: f64,
    step: usize,
    rng: StdRng,
}

impl RpsAutopilot {
    pub fn new(pattern: Vec<usize>, noise: f64, seed: Option<u64>) -> Self {
        RpsAutopilot {
            pattern,
            noise,
            step: 0,
            rng: session_rng(seed),
        }
    }

    fn play(&mut self, view: &RpsView) -> PlayerInput {
        if view.revealing || view.round >= view.total_rounds || self.pattern.is_empty() {
            return PlayerInput::None;
        }
        let scripted = self.pattern[self.step % self.pattern.len()];
        self.step += 1;
        let choices = view.labels.len().max(1);
        let choice = if self.rng.random_bool(self.noise) {
            self.rng.random_range(0..choices)
        } else {
            scripted
        };
        PlayerInput::Throw(choice)
    }
}

/// Drifts back to a favorite spot and sidesteps close projectiles.
pub struct DodgeAutopilot {
    /// Home position as a fraction of the field.
    pub home: Vec2,
    pub danger_radius: f64,
    rng: StdRng,
}

impl DodgeAutopilot {
    pub fn new(home: Vec2, seed: Option<u64>) -> Self {
        DodgeAutopilot {
            home,
            danger_radius: 14.0,
            rng: session_rng(seed),
        }
    }

    fn play(&mut self, view: &DodgeView) -> PlayerInput {
        let threat = view
            .projectiles
            .iter()
            .filter(|p| {
                let to_player = view.player - p.position;
                to_player.length() < self.danger_radius
                    && to_player.x * p.velocity.x + to_player.y * p.velocity.y > 0.0
            })
            .min_by(|a, b| {
                (view.player - a.position)
                    .length()
                    .total_cmp(&(view.player - b.position).length())
            });
        if let Some(p) = threat {
            let side = Vec2::new(-p.velocity.y, p.velocity.x);
            let sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
            return PlayerInput::Steer(side * sign);
        }

        let home = Vec2::new(self.home.x * view.field.x, self.home.y * view.field.y);
        let to_home = home - view.player;
        if to_home.length() < 1.0 {
            let wiggle = Vec2::new(
                self.rng.random_range(-0.3..=0.3),
                self.rng.random_range(-0.3..=0.3),
            );
            return PlayerInput::Steer(wiggle);
        }
        PlayerInput::Steer(to_home)
    }
}

/// Remembers part of the peek, plus every card it has since turned over.
pub struct MemoryAutopilot {
    /// Chance of remembering each card during the peek window.
    pub recall: f64,
    known: BTreeMap<usize, usize>,
    board: Option<(u32, usize)>,
    peeked: bool,
    rng: StdRng,
}

impl MemoryAutopilot {
    pub fn new(recall: f64, seed: Option<u64>) -> Self {
        MemoryAutopilot {
            recall,
            known: BTreeMap::new(),
            board: None,
            peeked: false,
            rng: session_rng(seed),
        }
    }

    fn play(&mut self, view: &MemoryView) -> PlayerInput {
        let board = (view.round, view.cards.len());
        if self.board != Some(board) {
            self.board = Some(board);
            self.known.clear();
            self.peeked = false;
        }
        if view.peeking {
            if !self.peeked {
                for (i, face) in view.cards.iter().enumerate() {
                    if let CardFace::Up(symbol) = face {
                        if self.rng.random_bool(self.recall) {
                            self.known.insert(i, *symbol);
                        }
                    }
                }
                self.peeked = true;
            }
            return PlayerInput::None;
        }

        let up: Vec<(usize, usize)> = view
            .cards
            .iter()
            .enumerate()
            .filter_map(|(i, face)| match face {
                CardFace::Up(symbol) => Some((i, *symbol)),
                _ => None,
            })
            .collect();
        for &(i, symbol) in &up {
            self.known.insert(i, symbol);
        }
        let hidden = |i: usize| view.cards.get(i) == Some(&CardFace::Hidden);

        match up.as_slice() {
            // Mismatch showing.
            [_, _, ..] => PlayerInput::None,
            [(first, symbol)] => {
                let partner = self
                    .known
                    .iter()
                    .find(|&(&i, &s)| s == *symbol && i != *first && hidden(i))
                    .map(|(&i, _)| i);
                match partner {
                    Some(i) => PlayerInput::Flip(i),
                    None => self.flip_unknown(view),
                }
            }
            [] => {
                let mut pair = None;
                for (&i, &s) in &self.known {
                    if !hidden(i) {
                        continue;
                    }
                    if self.known.iter().any(|(&j, &t)| j != i && t == s && hidden(j)) {
                        pair = Some(i);
                        break;
                    }
                }
                match pair {
                    Some(i) => PlayerInput::Flip(i),
                    None => self.flip_unknown(view),
                }
            }
        }
    }

    fn flip_unknown(&mut self, view: &MemoryView) -> PlayerInput {
        let unknown: Vec<usize> = view
            .cards
            .iter()
            .enumerate()
            .filter(|(i, face)| **face == CardFace::Hidden && !self.known.contains_key(i))
            .map(|(i, _)| i)
            .collect();
        let pick = unknown.choose(&mut self.rng).copied().or_else(|| {
            view.cards
                .iter()
                .position(|face| *face == CardFace::Hidden)
        });
        pick.map_or(PlayerInput::None, PlayerInput::Flip)
    }
}

/// One scripted player covering every game.
pub struct ScriptedPlayer {
    pub pong: PongAutopilot,
    pub connect_four: ConnectFourAutopilot,
    pub rps: RpsAutopilot,
    pub dodge: DodgeAutopilot,
    pub memory: MemoryAutopilot,
}

impl ScriptedPlayer {
    /// A player with easy-to-spot habits: aims high, favors column 2,
    /// throws rock-rock-paper, camps top-right, remembers most of the peek.
    pub fn habitual(seed: Option<u64>) -> Self {
        let sub = |n: u64| seed.map(|s| s.wrapping_mul(31).wrapping_add(n));
        ScriptedPlayer {
            pong: PongAutopilot::default(),
            connect_four: ConnectFourAutopilot::new(2, 0.8, sub(1)),
            rps: RpsAutopilot::new(vec![0, 0, 1], 0.1, sub(2)),
            dodge: DodgeAutopilot::new(Vec2::new(0.85, 0.15), sub(3)),
            memory: MemoryAutopilot::new(0.75, sub(4)),
        }
    }
}

impl Autopilot for ScriptedPlayer {
    fn next_input(&mut self, view: &GameView) -> PlayerInput {
        match view {
            GameView::Pong(v) => self.pong.play(v),
            GameView::ConnectFour(v) => self.connect_four.play(v),
            GameView::Rps(v) => self.rps.play(v),
            GameView::Dodge(v) => self.dodge.play(v),
            GameView::Memory(v) => self.memory.play(v),
        }
    }
}

/// A finished headless session: its summary and what the opponent learned.
#[derive(Debug, Clone)]
pub struct SessionRun {
    pub summary: SessionSummary,
    pub insights: Vec<Insight>,
}

/// Play one session of `game` to completion, or until the configured tick
/// cap, and report how it went.
pub fn run_session<S: ProfileStore>(
    arena: &mut Arena<S>,
    game: GameId,
    player: &mut dyn Autopilot,
) -> Option<SessionRun> {
    arena.start(game);
    let max_ticks = arena.config().session.max_ticks;
    for _ in 0..max_ticks {
        let Some(view) = arena.view() else {
            break;
        };
        let input = player.next_input(&view);
        arena.tick(input);
        if arena.is_finished() {
            break;
        }
    }
    if !arena.is_finished() {
        log::warn!("{} hit the {} tick cap", game.title(), max_ticks);
    }
    let insights = arena.insights();
    let summary = arena.stop()?;
    Some(SessionRun { summary, insights })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArenaConfig;
    use crate::profile::{GameResult, MemoryProfileStore};

    fn arena(seed: u64) -> Arena<MemoryProfileStore> {
        let mut config = ArenaConfig::default();
        config.session.seed = Some(seed);
        Arena::new(config, MemoryProfileStore::new())
    }

    #[test]
    fn test_rps_autopilot_follows_pattern_without_noise() {
        let mut pilot = RpsAutopilot::new(vec![2, 1], 0.0, Some(1));
        let view = RpsView {
            labels: vec!["Rock".into(), "Paper".into(), "Scissors".into()],
            round: 0,
            total_rounds: 10,
            revealing: false,
            last: None,
            human_score: 0,
            ai_score: 0,
        };
        let throws: Vec<PlayerInput> = (0..4).map(|_| pilot.play(&view)).collect();
        assert_eq!(
            throws,
            vec![
                PlayerInput::Throw(2),
                PlayerInput::Throw(1),
                PlayerInput::Throw(2),
                PlayerInput::Throw(1)
            ]
        );
        let waiting = RpsView { revealing: true, ..view };
        assert_eq!(pilot.play(&waiting), PlayerInput::None);
    }

    #[test]
    fn test_memory_autopilot_completes_a_known_pair() {
        let mut pilot = MemoryAutopilot::new(1.0, Some(2));
        let peek = MemoryView {
            cards: vec![
                CardFace::Up(0),
                CardFace::Up(1),
                CardFace::Up(1),
                CardFace::Up(0),
            ],
            tier: crate::ai::DifficultyTier::EASIEST,
            round: 0,
            total_rounds: 1,
            pairs_found: 0,
            attempts: 0,
            peeking: true,
            score: 50.0,
        };
        assert_eq!(pilot.play(&peek), PlayerInput::None);

        let playing = MemoryView {
            cards: vec![
                CardFace::Up(0),
                CardFace::Hidden,
                CardFace::Hidden,
                CardFace::Hidden,
            ],
            peeking: false,
            ..peek
        };
        assert_eq!(pilot.play(&playing), PlayerInput::Flip(3));
    }

    #[test]
    fn test_scripted_player_finishes_every_game() {
        let mut arena = arena(11);
        let mut player = ScriptedPlayer::habitual(Some(11));
        for game in GameId::ALL {
            let run = run_session(&mut arena, game, &mut player).unwrap();
            assert!(run.summary.result.is_some(), "{game} did not finish");
            assert!(!run.insights.is_empty());
        }
        assert_eq!(arena.store().profile().total_played(), 5);
    }

    #[test]
    fn test_camper_is_seen_camping() {
        let mut arena = arena(5);
        let mut player = ScriptedPlayer::habitual(Some(5));
        let summary = run_session(&mut arena, GameId::Dodge, &mut player)
            .unwrap()
            .summary;
        if summary.result == Some(GameResult::Win) {
            assert!(summary.patterns.iter().any(|t| t.starts_with("Camps near")));
        }
        let stats = arena.store().game_stats(GameId::Dodge);
        assert_eq!(stats.played, 1);
    }
}
