use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::agent::{Agent, Insight, InsightTone};

pub const MIN_TIER: u8 = 1;
pub const MAX_TIER: u8 = 5;

/// Difficulty level, always within `MIN_TIER..=MAX_TIER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DifficultyTier(u8);

impl DifficultyTier {
    pub const EASIEST: DifficultyTier = DifficultyTier(MIN_TIER);
    pub const HARDEST: DifficultyTier = DifficultyTier(MAX_TIER);

    /// Clamp any level into the valid range.
    pub fn new(level: u8) -> Self {
        DifficultyTier(level.clamp(MIN_TIER, MAX_TIER))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    pub fn harder(self) -> Self {
        DifficultyTier::new(self.0.saturating_add(1))
    }

    pub fn easier(self) -> Self {
        DifficultyTier::new(self.0.saturating_sub(1))
    }

    /// Zero-based offset from the easiest tier.
    fn steps(self) -> f64 {
        f64::from(self.0 - MIN_TIER)
    }
}

impl Default for DifficultyTier {
    fn default() -> Self {
        DifficultyTier::EASIEST
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tier {} of {}", self.0, MAX_TIER)
    }
}

/// Game parameters a tier maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierParams {
    pub pairs: usize,
    /// Ticks the board stays face up at round start.
    pub peek_ticks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    pub initial_score: f64,
    /// Weight of the newest round sample in the moving average.
    pub smoothing: f64,
    pub promote_base: f64,
    pub promote_step: f64,
    pub demote_base: f64,
    pub demote_step: f64,
    pub base_pairs: usize,
    pub pairs_per_tier: usize,
    pub base_peek_ticks: u32,
    pub peek_step_ticks: u32,
}

impl Default for RecallConfig {
    fn default() -> Self {
        RecallConfig {
            initial_score: 50.0,
            smoothing: 0.4,
            promote_base: 65.0,
            promote_step: 4.0,
            demote_base: 35.0,
            demote_step: 4.0,
            base_pairs: 4,
            pairs_per_tier: 2,
            base_peek_ticks: 90,
            peek_step_ticks: 12,
        }
    }
}

impl RecallConfig {
    pub fn params(&self, tier: DifficultyTier) -> TierParams {
        let steps = usize::from(tier.level() - MIN_TIER);
        TierParams {
            pairs: self.base_pairs + self.pairs_per_tier * steps,
            peek_ticks: self
                .base_peek_ticks
                .saturating_sub(self.peek_step_ticks * steps as u32)
                .max(1),
        }
    }

    fn promote_threshold(&self, tier: DifficultyTier) -> f64 {
        self.promote_base + self.promote_step * tier.steps()
    }

    fn demote_threshold(&self, tier: DifficultyTier) -> f64 {
        self.demote_base + self.demote_step * tier.steps()
    }
}

/// A card the player tried to recall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecallItem {
    pub position: usize,
    pub symbol: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecallCounter {
    pub seen: u32,
    pub recalled: u32,
}

impl RecallCounter {
    pub fn ratio(&self) -> f64 {
        if self.seen == 0 {
            0.0
        } else {
            f64::from(self.recalled) / f64::from(self.seen)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TierChange {
    Promoted,
    Held,
    Demoted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundReport {
    pub attempts: u32,
    pub efficiency: Option<f64>,
    pub score: f64,
    pub tier: DifficultyTier,
    pub change: TierChange,
}

/// Events the memory game reports to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecallEvent {
    Attempt { item: RecallItem, recalled: bool },
    RoundEnd { ideal_attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecallSummary {
    pub score: f64,
    pub tier: DifficultyTier,
    pub rounds: u32,
    pub attempts: u32,
    pub recalled: u32,
    /// Positions recalled least reliably, worst first.
    pub weak_positions: Vec<usize>,
}

/// Tracks recall per position and symbol, smooths a 0..=100 recall score
/// across rounds, and steps the difficulty tier with hysteresis.
pub struct RecallDifficultyController {
    config: RecallConfig,
    positions: BTreeMap<usize, RecallCounter>,
    symbols: BTreeMap<usize, RecallCounter>,
    round_attempts: u32,
    total_attempts: u32,
    total_recalled: u32,
    score: f64,
    tier: DifficultyTier,
    rounds: u32,
    last_change: TierChange,
}

impl RecallDifficultyController {
    pub fn new(config: RecallConfig) -> Self {
        let score = config.initial_score;
        Self::resume(config, DifficultyTier::EASIEST, score)
    }

    /// Start from a tier and score carried over from earlier sessions.
    pub fn resume(config: RecallConfig, tier: DifficultyTier, score: f64) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            config.initial_score.clamp(0.0, 100.0)
        };
        RecallDifficultyController {
            config,
            positions: BTreeMap::new(),
            symbols: BTreeMap::new(),
            round_attempts: 0,
            total_attempts: 0,
            total_recalled: 0,
            score,
            tier,
            rounds: 0,
            last_change: TierChange::Held,
        }
    }

    pub fn config(&self) -> &RecallConfig {
        &self.config
    }

    /// Record one attempt on `item`.
    pub fn record(&mut self, item: RecallItem, recalled: bool) {
        for counter in [
            self.positions.entry(item.position).or_default(),
            self.symbols.entry(item.symbol).or_default(),
        ] {
            counter.seen += 1;
            if recalled {
                counter.recalled += 1;
            }
        }
        self.round_attempts += 1;
        self.total_attempts += 1;
        if recalled {
            self.total_recalled += 1;
        }
    }

    pub fn current_score(&self) -> f64 {
        self.score
    }

    /// Tier for the next round.
    pub fn next_difficulty(&self) -> DifficultyTier {
        self.tier
    }

    pub fn next_params(&self) -> TierParams {
        self.config.params(self.tier)
    }

    pub fn round_attempts(&self) -> u32 {
        self.round_attempts
    }

    pub fn position(&self, position: usize) -> RecallCounter {
        self.positions.get(&position).copied().unwrap_or_default()
    }

    pub fn symbol(&self, symbol: usize) -> RecallCounter {
        self.symbols.get(&symbol).copied().unwrap_or_default()
    }

    /// Close the round: fold its efficiency into the smoothed score and step
    /// the tier by at most one. A round with no attempts changes nothing.
    pub fn finish_round(&mut self, ideal_attempts: u32) -> RoundReport {
        let attempts = std::mem::take(&mut self.round_attempts);
        if attempts == 0 {
            return RoundReport {
                attempts,
                efficiency: None,
                score: self.score,
                tier: self.tier,
                change: TierChange::Held,
            };
        }

        let efficiency = (f64::from(ideal_attempts) / f64::from(attempts)).min(1.0);
        let sample = 100.0 * efficiency;
        let w = self.config.smoothing.clamp(0.0, 1.0);
        self.score = ((1.0 - w) * self.score + w * sample).clamp(0.0, 100.0);
        self.rounds += 1;

        self.last_change = if self.tier < DifficultyTier::HARDEST
            && self.score >= self.config.promote_threshold(self.tier)
        {
            self.tier = self.tier.harder();
            TierChange::Promoted
        } else if self.tier > DifficultyTier::EASIEST
            && self.score < self.config.demote_threshold(self.tier)
        {
            self.tier = self.tier.easier();
            TierChange::Demoted
        } else {
            TierChange::Held
        };

        RoundReport {
            attempts,
            efficiency: Some(efficiency),
            score: self.score,
            tier: self.tier,
            change: self.last_change,
        }
    }

    /// Positions seen at least twice, worst recall ratio first.
    pub fn weak_positions(&self, limit: usize) -> Vec<usize> {
        let mut seen: Vec<(usize, RecallCounter)> = self
            .positions
            .iter()
            .filter(|(_, c)| c.seen >= 2)
            .map(|(&p, &c)| (p, c))
            .collect();
        seen.sort_by(|a, b| a.1.ratio().total_cmp(&b.1.ratio()).then(a.0.cmp(&b.0)));
        seen.into_iter()
            .filter(|(_, c)| c.ratio() < 1.0)
            .take(limit)
            .map(|(p, _)| p)
            .collect()
    }

    pub fn summary(&self) -> RecallSummary {
        RecallSummary {
            score: self.score,
            tier: self.tier,
            rounds: self.rounds,
            attempts: self.total_attempts,
            recalled: self.total_recalled,
            weak_positions: self.weak_positions(3),
        }
    }
}

impl Agent for RecallDifficultyController {
    type Observation = ();
    type Action = DifficultyTier;
    type Outcome = RecallEvent;

    fn decide(&mut self, _: &()) -> DifficultyTier {
        self.next_difficulty()
    }

    fn observe(&mut self, event: RecallEvent) {
        match event {
            RecallEvent::Attempt { item, recalled } => self.record(item, recalled),
            RecallEvent::RoundEnd { ideal_attempts } => {
                self.finish_round(ideal_attempts);
            }
        }
    }

    fn insights(&self) -> Vec<Insight> {
        let mut insights = vec![
            Insight::new("Recall score", format!("{:.0}/100", self.score))
                .with_confidence(self.score / 100.0),
            Insight::new("Difficulty", self.tier.to_string()),
        ];

        let trend = match self.last_change {
            TierChange::Promoted => ("Trend", "getting harder", InsightTone::Confident),
            TierChange::Demoted => ("Trend", "easing off", InsightTone::Learning),
            TierChange::Held => ("Trend", "holding steady", InsightTone::Neutral),
        };
        insights.push(Insight::new(trend.0, trend.1).with_tone(trend.2));

        if let Some(&weak) = self.weak_positions(1).first() {
            let ratio = self.position(weak).ratio();
            insights.push(
                Insight::new("Blind spot", format!("card #{}", weak + 1))
                    .with_confidence(1.0 - ratio),
            );
        }

        insights
    }

    fn name(&self) -> &str {
        "Recall controller"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> RecallDifficultyController {
        RecallDifficultyController::new(RecallConfig::default())
    }

    fn play_round(c: &mut RecallDifficultyController, ideal: u32, attempts: u32) -> RoundReport {
        for i in 0..attempts {
            let item = RecallItem {
                position: i as usize % 8,
                symbol: i as usize % 4,
            };
            c.record(item, i < ideal);
        }
        c.finish_round(ideal)
    }

    #[test]
    fn perfect_round_promotes_one_tier() {
        let mut c = controller();
        let report = play_round(&mut c, 6, 6);
        assert_eq!(report.efficiency, Some(1.0));
        assert!((report.score - 70.0).abs() < 1e-9);
        assert_eq!(report.tier, DifficultyTier::new(2));
        assert_eq!(report.change, TierChange::Promoted);
    }

    #[test]
    fn terrible_round_demotes_one_tier() {
        let mut c = RecallDifficultyController::resume(
            RecallConfig::default(),
            DifficultyTier::new(4),
            60.0,
        );
        let report = play_round(&mut c, 1, 200);
        assert!(report.score < 37.0);
        assert_eq!(report.tier, DifficultyTier::new(3));
    }

    #[test]
    fn extreme_rounds_never_jump_more_than_one_tier() {
        let mut c = controller();
        let mut previous = c.next_difficulty().level();
        for round in 0..40 {
            let report = if (round / 10) % 2 == 0 {
                play_round(&mut c, 8, 8)
            } else {
                play_round(&mut c, 1, 100)
            };
            let now = report.tier.level();
            assert!(now.abs_diff(previous) <= 1);
            assert!((MIN_TIER..=MAX_TIER).contains(&now));
            assert!((0.0..=100.0).contains(&report.score));
            previous = now;
        }
    }

    #[test]
    fn empty_round_leaves_score_alone() {
        let mut c = controller();
        let report = c.finish_round(8);
        assert_eq!(report.efficiency, None);
        assert_eq!(report.score, 50.0);
        assert_eq!(report.change, TierChange::Held);
        assert_eq!(c.summary().rounds, 0);
    }

    #[test]
    fn inconsistent_player_settles_on_a_tier() {
        let mut c = controller();
        let mut tiers = Vec::new();
        for round in 0..30 {
            let ideal = if round % 2 == 0 { 4 } else { 3 };
            tiers.push(play_round(&mut c, ideal, 5).tier);
        }
        assert!(tiers[10..].iter().all(|&t| t == DifficultyTier::new(3)));
    }

    #[test]
    fn counters_split_by_position_and_symbol() {
        let mut c = controller();
        let a = RecallItem { position: 2, symbol: 7 };
        let b = RecallItem { position: 3, symbol: 7 };
        c.record(a, true);
        c.record(a, false);
        c.record(b, true);
        assert_eq!(c.position(2), RecallCounter { seen: 2, recalled: 1 });
        assert_eq!(c.position(3), RecallCounter { seen: 1, recalled: 1 });
        assert_eq!(c.symbol(7), RecallCounter { seen: 3, recalled: 2 });
        assert_eq!(c.round_attempts(), 3);
        assert_eq!(c.weak_positions(3), vec![2]);
    }

    #[test]
    fn harder_tiers_mean_more_pairs_and_shorter_peeks() {
        let config = RecallConfig::default();
        let easy = config.params(DifficultyTier::EASIEST);
        let hard = config.params(DifficultyTier::HARDEST);
        assert_eq!(easy, TierParams { pairs: 4, peek_ticks: 90 });
        assert_eq!(hard, TierParams { pairs: 12, peek_ticks: 42 });
    }

    #[test]
    fn tier_construction_clamps() {
        assert_eq!(DifficultyTier::new(0), DifficultyTier::EASIEST);
        assert_eq!(DifficultyTier::new(9), DifficultyTier::HARDEST);
        assert_eq!(DifficultyTier::HARDEST.harder(), DifficultyTier::HARDEST);
        assert_eq!(DifficultyTier::new(3).to_string(), "Tier 3 of 5");
    }

    #[test]
    fn resume_clamps_score() {
        let c = RecallDifficultyController::resume(
            RecallConfig::default(),
            DifficultyTier::new(2),
            f64::NAN,
        );
        assert_eq!(c.current_score(), 50.0);
        let c = RecallDifficultyController::resume(
            RecallConfig::default(),
            DifficultyTier::new(2),
            140.0,
        );
        assert_eq!(c.current_score(), 100.0);
    }

    #[test]
    fn agent_interface_drives_rounds() {
        let mut c = controller();
        let item = RecallItem { position: 0, symbol: 0 };
        for _ in 0..4 {
            c.observe(RecallEvent::Attempt { item, recalled: true });
        }
        c.observe(RecallEvent::RoundEnd { ideal_attempts: 4 });
        assert_eq!(c.decide(&()), DifficultyTier::new(2));
        let first = c.insights();
        assert_eq!(first, c.insights());
        assert_eq!(first[1].value, "Tier 2 of 5");
    }
}
