//! Rock-paper-scissors against the sequence predictor. The AI commits to its
//! counter when the player throws; both are shown after a reveal delay.

use serde::{Deserialize, Serialize};

use crate::ai::{Agent, Guess, Insight, SequenceConfig, SequencePredictor};
use crate::arena::scheduler::Scheduler;
use crate::arena::{GameSession, GameView, InputStatus, PlayerInput, SessionSummary};
use crate::game::Side;
use crate::profile::{GameId, GameResult, GameStats, PatternSummary};

pub const CHOICES: usize = 3;

/// The throw that beats `choice` (rock 0, paper 1, scissors 2).
pub fn counter(choice: usize) -> usize {
    (choice + 1) % CHOICES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpsConfig {
    pub rounds: usize,
    pub reveal_ticks: u64,
    pub predictor: SequenceConfig,
}

impl Default for RpsConfig {
    fn default() -> Self {
        RpsConfig {
            rounds: 15,
            reveal_ticks: 30,
            predictor: SequenceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpsRound {
    pub human: usize,
    pub ai: usize,
    pub winner: Option<Side>,
}

impl RpsRound {
    fn resolve(human: usize, ai: usize) -> Self {
        let winner = if human == ai {
            None
        } else if human == counter(ai) {
            Some(Side::Human)
        } else {
            Some(Side::Ai)
        };
        RpsRound { human, ai, winner }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpsView {
    pub labels: Vec<String>,
    pub round: usize,
    pub total_rounds: usize,
    pub revealing: bool,
    pub last: Option<RpsRound>,
    pub human_score: u32,
    pub ai_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RpsEvent {
    Reveal,
}

#[derive(Debug, Clone, Copy)]
struct PendingThrow {
    human: usize,
    ai: usize,
}

pub struct RpsSession {
    config: RpsConfig,
    seed: Option<u64>,
    predictor: SequencePredictor,
    scheduler: Scheduler<RpsEvent>,
    pending: Option<PendingThrow>,
    rounds: Vec<RpsRound>,
    human_score: u32,
    ai_score: u32,
    running: bool,
    finished: bool,
    ticks: u64,
}

impl RpsSession {
    pub fn new(config: RpsConfig, seed: Option<u64>) -> Self {
        RpsSession {
            predictor: Self::build_predictor(&config, seed),
            config,
            seed,
            scheduler: Scheduler::new(),
            pending: None,
            rounds: Vec::new(),
            human_score: 0,
            ai_score: 0,
            running: false,
            finished: false,
            ticks: 0,
        }
    }

    fn build_predictor(config: &RpsConfig, seed: Option<u64>) -> SequencePredictor {
        match seed {
            Some(seed) => SequencePredictor::with_seed(config.predictor.clone(), seed),
            None => SequencePredictor::new(config.predictor.clone()),
        }
    }

    pub fn predictor(&self) -> &SequencePredictor {
        &self.predictor
    }

    pub fn rounds(&self) -> &[RpsRound] {
        &self.rounds
    }

    fn throw(&mut self, human: usize) -> InputStatus {
        if self.pending.is_some() {
            return InputStatus::Busy;
        }
        if human >= CHOICES {
            return InputStatus::Invalid;
        }
        let Guess { choice, .. } = self.predictor.decide(&());
        self.pending = Some(PendingThrow {
            human,
            ai: counter(choice),
        });
        self.scheduler.schedule(self.config.reveal_ticks, RpsEvent::Reveal);
        InputStatus::Accepted
    }

    fn reveal(&mut self) {
        let Some(PendingThrow { human, ai }) = self.pending.take() else {
            return;
        };
        self.predictor.observe(human);
        let round = RpsRound::resolve(human, ai);
        match round.winner {
            Some(Side::Human) => self.human_score += 1,
            Some(Side::Ai) => self.ai_score += 1,
            None => {}
        }
        self.rounds.push(round);

        if self.rounds.len() >= self.config.rounds {
            self.finished = true;
            self.running = false;
            self.scheduler.cancel_all();
        }
    }

    fn label(&self, choice: usize) -> String {
        self.config
            .predictor
            .choice_labels
            .get(choice)
            .map(|l| l.to_lowercase())
            .unwrap_or_else(|| choice.to_string())
    }

    fn patterns(&self) -> Vec<String> {
        let mut tags = Vec::new();
        let throws: Vec<usize> = self.rounds.iter().map(|r| r.human).collect();
        if throws.len() < 6 {
            return tags;
        }

        let mut counts = [0usize; CHOICES];
        for &t in &throws {
            counts[t] += 1;
        }
        if let Some((choice, &count)) = counts.iter().enumerate().max_by_key(|&(_, c)| *c) {
            if count as f64 / throws.len() as f64 >= 0.45 {
                tags.push(format!("Favors {}", self.label(choice)));
            }
        }

        let pairs = throws.len() - 1;
        let repeats = throws.windows(2).filter(|w| w[0] == w[1]).count();
        let cycles = throws.windows(2).filter(|w| w[1] == counter(w[0])).count();
        if repeats as f64 / pairs as f64 >= 0.5 {
            tags.push("Repeats throws".to_string());
        } else if cycles as f64 / pairs as f64 >= 0.5 {
            tags.push("Cycles throws".to_string());
        }

        let summary = self.predictor.summary();
        if summary.predictions >= 5
            && f64::from(summary.correct) / f64::from(summary.predictions) >= 0.55
        {
            tags.push("Predictable sequences".to_string());
        }
        tags
    }
}

impl GameSession for RpsSession {
    fn game_id(&self) -> GameId {
        GameId::Rps
    }

    fn start(&mut self, _stats: &GameStats) {
        *self = RpsSession::new(self.config.clone(), self.seed);
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        self.pending = None;
        self.scheduler.cancel_all();
    }

    fn tick(&mut self, input: PlayerInput) -> InputStatus {
        if !self.running {
            return InputStatus::NotRunning;
        }
        self.ticks += 1;

        for event in self.scheduler.advance() {
            match event {
                RpsEvent::Reveal => self.reveal(),
            }
        }
        if self.finished {
            return InputStatus::Idle;
        }

        match input {
            PlayerInput::Throw(choice) => self.throw(choice),
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
        GameView::Rps(RpsView {
            labels: self.config.predictor.choice_labels.clone(),
            round: self.rounds.len(),
            total_rounds: self.config.rounds,
            revealing: self.pending.is_some(),
            last: self.rounds.last().copied(),
            human_score: self.human_score,
            ai_score: self.ai_score,
        })
    }

    fn insights(&self) -> Vec<Insight> {
        self.predictor.insights()
    }

    fn summary(&self) -> SessionSummary {
        let result = self.finished.then(|| match self.human_score.cmp(&self.ai_score) {
            std::cmp::Ordering::Greater => GameResult::Win,
            std::cmp::Ordering::Less => GameResult::Loss,
            std::cmp::Ordering::Equal => GameResult::Draw,
        });
        let learned = self.predictor.summary();
        SessionSummary {
            game: GameId::Rps,
            result,
            patterns: self.patterns(),
            pattern_summary: PatternSummary::Rps {
                accuracy: self.predictor.accuracy(),
                choice_counts: learned.choice_counts,
                pattern_count: learned.pattern_count,
            },
            ticks: self.ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(config: RpsConfig) -> RpsSession {
        let mut session = RpsSession::new(config, Some(4));
        session.start(&GameStats::default());
        session
    }

    fn fast() -> RpsConfig {
        RpsConfig {
            rounds: 12,
            reveal_ticks: 2,
            ..Default::default()
        }
    }

    /// Throw `choice`, then tick until the reveal lands.
    fn play(session: &mut RpsSession, choice: usize) {
        assert_eq!(session.tick(PlayerInput::Throw(choice)), InputStatus::Accepted);
        while session.pending.is_some() {
            session.tick(PlayerInput::None);
        }
    }

    #[test]
    fn test_round_resolution() {
        assert_eq!(RpsRound::resolve(1, 0).winner, Some(Side::Human));
        assert_eq!(RpsRound::resolve(0, 1).winner, Some(Side::Ai));
        assert_eq!(RpsRound::resolve(2, 2).winner, None);
        assert_eq!(RpsRound::resolve(0, 2).winner, Some(Side::Human));
    }

    #[test]
    fn test_throws_rejected_during_reveal() {
        let mut session = started(fast());
        assert_eq!(session.tick(PlayerInput::Throw(0)), InputStatus::Accepted);
        assert_eq!(session.tick(PlayerInput::Throw(1)), InputStatus::Busy);
        session.tick(PlayerInput::None);
        assert_eq!(session.rounds().len(), 1);
        assert_eq!(session.rounds()[0].human, 0);
        assert_eq!(session.tick(PlayerInput::Throw(5)), InputStatus::Invalid);
    }

    #[test]
    fn test_predictor_punishes_a_rock_player() {
        let mut session = started(fast());
        for _ in 0..12 {
            play(&mut session, 0);
        }
        assert!(session.is_finished());
        // Once the pattern is known, every AI throw is paper.
        assert!(session.rounds()[3..].iter().all(|r| r.ai == 1));

        let summary = session.summary();
        assert_eq!(summary.result, Some(GameResult::Loss));
        assert!(summary.patterns.contains(&"Favors rock".to_string()));
        assert!(summary.patterns.contains(&"Repeats throws".to_string()));
        assert!(summary.patterns.contains(&"Predictable sequences".to_string()));
    }

    #[test]
    fn test_cycling_player_is_tagged() {
        let mut session = started(fast());
        for i in 0..12 {
            play(&mut session, i % 3);
        }
        let summary = session.summary();
        assert!(summary.patterns.contains(&"Cycles throws".to_string()));
        assert!(!summary.patterns.iter().any(|t| t.starts_with("Favors")));
    }

    #[test]
    fn test_stop_drops_pending_reveal() {
        let mut session = started(fast());
        session.tick(PlayerInput::Throw(2));
        session.stop();
        assert_eq!(session.tick(PlayerInput::None), InputStatus::NotRunning);
        assert!(session.rounds().is_empty());
        assert_eq!(session.summary().result, None);
    }
}
