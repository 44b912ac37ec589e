//! Memory match: a shuffled board of face-down pairs, shown briefly at the
//! start of each round. The recall controller picks the board size and peek
//! window for every round from how efficiently the player cleared the last.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::ai::{
    Agent, DifficultyTier, Insight, RecallConfig, RecallDifficultyController, RecallEvent,
    RecallItem, TierChange,
};
use crate::arena::scheduler::Scheduler;
use crate::arena::{session_rng, GameSession, GameView, InputStatus, PlayerInput, SessionSummary};
use crate::profile::{GameId, GameResult, GameStats, PatternSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub rounds: u32,
    /// Ticks a mismatched pair stays face up.
    pub mismatch_ticks: u64,
    /// Overall ideal/actual flips needed to count the session as a win.
    pub win_efficiency: f64,
    pub recall: RecallConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            rounds: 3,
            mismatch_ticks: 40,
            win_efficiency: 0.6,
            recall: RecallConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFace {
    Hidden,
    Up(usize),
    Matched(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryView {
    pub cards: Vec<CardFace>,
    pub tier: DifficultyTier,
    pub round: u32,
    pub total_rounds: u32,
    pub pairs_found: usize,
    pub attempts: u32,
    pub peeking: bool,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryEvent {
    PeekEnd,
    HideMismatch { a: usize, b: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Peeking,
    Playing,
    Mismatch,
}

#[derive(Debug, Clone, Copy)]
struct Card {
    symbol: usize,
    face: CardFace,
}

pub struct MemorySession {
    config: MemoryConfig,
    seed: Option<u64>,
    recall: RecallDifficultyController,
    rng: StdRng,
    scheduler: Scheduler<MemoryEvent>,
    cards: Vec<Card>,
    phase: Phase,
    first_flip: Option<usize>,
    tier: DifficultyTier,
    round: u32,
    pairs_found: usize,
    round_attempts: u32,
    ideal_total: u32,
    attempts_total: u32,
    running: bool,
    finished: bool,
    ticks: u64,
}

impl MemorySession {
    pub fn new(config: MemoryConfig, seed: Option<u64>) -> Self {
        let recall = RecallDifficultyController::new(config.recall.clone());
        MemorySession {
            tier: recall.next_difficulty(),
            recall,
            config,
            seed,
            rng: session_rng(seed),
            scheduler: Scheduler::new(),
            cards: Vec::new(),
            phase: Phase::Peeking,
            first_flip: None,
            round: 0,
            pairs_found: 0,
            round_attempts: 0,
            ideal_total: 0,
            attempts_total: 0,
            running: false,
            finished: false,
            ticks: 0,
        }
    }

    pub fn controller(&self) -> &RecallDifficultyController {
        &self.recall
    }

    /// Symbols of every card, face-up or not.
    pub fn layout(&self) -> Vec<usize> {
        self.cards.iter().map(|c| c.symbol).collect()
    }

    pub fn tier(&self) -> DifficultyTier {
        self.tier
    }

    fn deal(&mut self) {
        self.tier = self.recall.decide(&());
        let params = self.config.recall.params(self.tier);
        let mut symbols: Vec<usize> = (0..params.pairs).flat_map(|s| [s, s]).collect();
        symbols.shuffle(&mut self.rng);

        self.cards = symbols
            .into_iter()
            .map(|symbol| Card {
                symbol,
                face: CardFace::Hidden,
            })
            .collect();
        self.phase = Phase::Peeking;
        self.first_flip = None;
        self.pairs_found = 0;
        self.round_attempts = 0;
        self.scheduler
            .schedule(u64::from(params.peek_ticks), MemoryEvent::PeekEnd);
        log::debug!(
            "memory round {} dealt: {} pairs at {}",
            self.round + 1,
            params.pairs,
            self.tier
        );
    }

    fn flip(&mut self, index: usize) -> InputStatus {
        match self.phase {
            Phase::Peeking | Phase::Mismatch => return InputStatus::Busy,
            Phase::Playing => {}
        }
        let Some(card) = self.cards.get(index) else {
            return InputStatus::Invalid;
        };
        if card.face != CardFace::Hidden {
            return InputStatus::Invalid;
        }
        let symbol = card.symbol;
        self.cards[index].face = CardFace::Up(symbol);

        let Some(first) = self.first_flip.take() else {
            self.first_flip = Some(index);
            return InputStatus::Accepted;
        };

        self.round_attempts += 1;
        let matched = self.cards[first].symbol == symbol;
        self.recall.observe(RecallEvent::Attempt {
            item: RecallItem {
                position: index,
                symbol,
            },
            recalled: matched,
        });

        if matched {
            self.cards[first].face = CardFace::Matched(symbol);
            self.cards[index].face = CardFace::Matched(symbol);
            self.pairs_found += 1;
            if self.pairs_found * 2 == self.cards.len() {
                self.end_round();
            }
        } else {
            self.phase = Phase::Mismatch;
            self.scheduler.schedule(
                self.config.mismatch_ticks,
                MemoryEvent::HideMismatch { a: first, b: index },
            );
        }
        InputStatus::Accepted
    }

    fn end_round(&mut self) {
        let ideal = self.pairs_found as u32;
        self.ideal_total += ideal;
        self.attempts_total += self.round_attempts;
        let report = self.recall.finish_round(ideal);
        self.round += 1;
        log::info!(
            "memory round {} cleared in {} attempts, score {:.0}, {}",
            self.round,
            report.attempts,
            report.score,
            report.tier
        );
        if report.change != TierChange::Held {
            log::debug!("memory tier {:?} to {}", report.change, report.tier);
        }

        if self.round >= self.config.rounds {
            self.finished = true;
            self.running = false;
            self.scheduler.cancel_all();
        } else {
            self.deal();
        }
    }

    fn handle(&mut self, event: MemoryEvent) {
        match event {
            MemoryEvent::PeekEnd => {
                if self.phase == Phase::Peeking {
                    self.phase = Phase::Playing;
                }
            }
            MemoryEvent::HideMismatch { a, b } => {
                for i in [a, b] {
                    if let Some(card) = self.cards.get_mut(i) {
                        if matches!(card.face, CardFace::Up(_)) {
                            card.face = CardFace::Hidden;
                        }
                    }
                }
                self.phase = Phase::Playing;
            }
        }
    }

    fn efficiency(&self) -> Option<f64> {
        (self.attempts_total > 0)
            .then(|| (f64::from(self.ideal_total) / f64::from(self.attempts_total)).min(1.0))
    }

    fn patterns(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if self.recall.summary().rounds == 0 {
            return tags;
        }
        let score = self.recall.current_score();
        if score >= 70.0 {
            tags.push("Strong recall".to_string());
        } else if score < 40.0 {
            tags.push("Shaky recall".to_string());
        }
        if self.tier.level() >= 4 {
            tags.push("Handles big boards".to_string());
        }
        if let Some(&weak) = self.recall.weak_positions(1).first() {
            tags.push(format!("Forgets card #{}", weak + 1));
        }
        tags
    }
}

impl GameSession for MemorySession {
    fn game_id(&self) -> GameId {
        GameId::Memory
    }

    fn start(&mut self, stats: &GameStats) {
        *self = MemorySession::new(self.config.clone(), self.seed);
        if let Some(PatternSummary::Memory { score, tier, .. }) = stats.last_summary {
            self.recall = RecallDifficultyController::resume(
                self.config.recall.clone(),
                DifficultyTier::new(tier),
                score,
            );
        }
        self.running = true;
        self.deal();
    }

    fn stop(&mut self) {
        self.running = false;
        self.first_flip = None;
        self.scheduler.cancel_all();
    }

    fn tick(&mut self, input: PlayerInput) -> InputStatus {
        if !self.running {
            return InputStatus::NotRunning;
        }
        self.ticks += 1;

        for event in self.scheduler.advance() {
            self.handle(event);
        }

        match input {
            PlayerInput::Flip(index) => self.flip(index),
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
        let peeking = self.phase == Phase::Peeking && self.running;
        let cards = self
            .cards
            .iter()
            .map(|c| match c.face {
                CardFace::Hidden if peeking => CardFace::Up(c.symbol),
                face => face,
            })
            .collect();
        GameView::Memory(MemoryView {
            cards,
            tier: self.tier,
            round: self.round,
            total_rounds: self.config.rounds,
            pairs_found: self.pairs_found,
            attempts: self.round_attempts,
            peeking,
            score: self.recall.current_score(),
        })
    }

    fn insights(&self) -> Vec<Insight> {
        let mut insights = self.recall.insights();
        if let Some(efficiency) = self.efficiency() {
            insights.push(
                Insight::new("Flip efficiency", format!("{:.0}%", efficiency * 100.0))
                    .with_confidence(efficiency),
            );
        }
        insights
    }

    fn summary(&self) -> SessionSummary {
        let result = self.finished.then(|| {
            if self.efficiency().unwrap_or(0.0) >= self.config.win_efficiency {
                GameResult::Win
            } else {
                GameResult::Loss
            }
        });
        let learned = self.recall.summary();
        SessionSummary {
            game: GameId::Memory,
            result,
            patterns: self.patterns(),
            pattern_summary: PatternSummary::Memory {
                score: learned.score,
                tier: learned.tier.level(),
                rounds: learned.rounds,
            },
            ticks: self.ticks,
        }
    }
}
