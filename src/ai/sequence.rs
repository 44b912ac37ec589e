use std::collections::{BTreeMap, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::agent::{Agent, Insight};

/// N-gram predictor parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Longest suffix tracked.
    pub max_order: usize,
    /// Observations an order needs before it may predict.
    pub min_observations: u32,
    /// Confidence bonus per order: `ratio * (1 + order * order_weight)`.
    pub order_weight: f64,
    /// Display names for the choices; its length is the number of choices.
    pub choice_labels: Vec<String>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        SequenceConfig {
            max_order: 4,
            min_observations: 2,
            order_weight: 0.3,
            choice_labels: vec!["Rock".into(), "Paper".into(), "Scissors".into()],
        }
    }
}

/// Suffix → next-choice frequency tables, one per order.
#[derive(Debug, Clone, Default)]
pub struct NGramTable {
    orders: Vec<HashMap<Vec<usize>, BTreeMap<usize, u32>>>,
}

impl NGramTable {
    pub fn new(max_order: usize) -> Self {
        NGramTable {
            orders: vec![HashMap::new(); max_order],
        }
    }

    pub fn max_order(&self) -> usize {
        self.orders.len()
    }

    /// Record that each suffix of `history` (up to the max order) was followed
    /// by `next`. Orders longer than the history are skipped.
    pub fn record(&mut self, history: &[usize], next: usize) {
        for (idx, table) in self.orders.iter_mut().enumerate() {
            let order = idx + 1;
            if history.len() < order {
                break;
            }
            let suffix = history[history.len() - order..].to_vec();
            *table.entry(suffix).or_default().entry(next).or_insert(0) += 1;
        }
    }

    /// Next-choice counts seen after `suffix`.
    pub fn counts(&self, suffix: &[usize]) -> Option<&BTreeMap<usize, u32>> {
        let order = suffix.len();
        if order == 0 || order > self.orders.len() {
            return None;
        }
        self.orders[order - 1].get(suffix)
    }

    /// Total number of recorded transitions at one order.
    pub fn observations(&self, order: usize) -> u64 {
        if order == 0 || order > self.orders.len() {
            return 0;
        }
        self.orders[order - 1]
            .values()
            .flat_map(|next| next.values())
            .map(|&c| u64::from(c))
            .sum()
    }

    /// Number of distinct suffixes across all orders.
    pub fn pattern_count(&self) -> usize {
        self.orders.iter().map(HashMap::len).sum()
    }

    pub fn reset(&mut self) {
        for table in &mut self.orders {
            table.clear();
        }
    }
}

/// A predicted next choice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub choice: usize,
    /// Order-weighted confidence used to rank orders against each other.
    pub confidence: f64,
    /// Share of the modal choice at the winning order, in [0, 1].
    pub ratio: f64,
    pub order: usize,
    pub observations: u32,
}

/// What the predictor hands to the game: the prediction, if any, and the
/// choice it settled on (the prediction, or uniform random without one).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guess {
    pub prediction: Option<Prediction>,
    pub choice: usize,
}

/// Coarse numbers exported to the profile at session end.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSummary {
    pub observations: usize,
    pub predictions: u32,
    pub correct: u32,
    pub choice_counts: Vec<u32>,
    pub pattern_count: usize,
}

/// Statistical predictor over the player's discrete choice history.
pub struct SequencePredictor {
    config: SequenceConfig,
    table: NGramTable,
    history: Vec<usize>,
    pending: Option<Guess>,
    predictions: u32,
    correct: u32,
    rng: StdRng,
}

impl SequencePredictor {
    pub fn new(config: SequenceConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: SequenceConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SequenceConfig, rng: StdRng) -> Self {
        let table = NGramTable::new(config.max_order);
        SequencePredictor {
            config,
            table,
            history: Vec::new(),
            pending: None,
            predictions: 0,
            correct: 0,
            rng,
        }
    }

    pub fn choices(&self) -> usize {
        self.config.choice_labels.len().max(1)
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    pub fn table(&self) -> &NGramTable {
        &self.table
    }

    /// Predict the choice that follows `history`.
    ///
    /// Orders are scanned from longest to shortest; each order with enough
    /// history and at least `min_observations` transitions proposes its modal
    /// next choice. The highest confidence wins, and on an exact tie the order
    /// evaluated later (the shorter one) wins.
    pub fn predict(&self, history: &[usize]) -> Option<Prediction> {
        let mut best: Option<Prediction> = None;

        for order in (1..=self.table.max_order()).rev() {
            if history.len() < order {
                continue;
            }
            let suffix = &history[history.len() - order..];
            let Some(counts) = self.table.counts(suffix) else {
                continue;
            };
            let total: u32 = counts.values().sum();
            if total < self.config.min_observations || total == 0 {
                continue;
            }
            // BTreeMap iterates in key order, so the smallest choice wins a tie.
            let (choice, mode) = counts
                .iter()
                .fold((0usize, 0u32), |acc, (&c, &n)| if n > acc.1 { (c, n) } else { acc });

            let ratio = f64::from(mode) / f64::from(total);
            let confidence = ratio * (1.0 + order as f64 * self.config.order_weight);
            if best.map_or(true, |b| confidence >= b.confidence) {
                best = Some(Prediction {
                    choice,
                    confidence,
                    ratio,
                    order,
                    observations: total,
                });
            }
        }

        best
    }

    /// Record that `next` followed `history`.
    pub fn learn(&mut self, history: &[usize], next: usize) {
        self.table.record(history, next);
    }

    /// Learn from the predictor's own history, then append `choice` to it.
    pub fn record(&mut self, choice: usize) {
        self.table.record(&self.history, choice);
        self.history.push(choice);
    }

    /// Prediction for the predictor's own history.
    pub fn predict_next(&self) -> Option<Prediction> {
        self.predict(&self.history)
    }

    /// Drop every learned count and the history.
    pub fn reset(&mut self) {
        self.table.reset();
        self.history.clear();
        self.pending = None;
    }

    pub fn accuracy(&self) -> Option<f64> {
        if self.predictions == 0 {
            None
        } else {
            Some(f64::from(self.correct) / f64::from(self.predictions))
        }
    }

    pub fn choice_counts(&self) -> Vec<u32> {
        let mut counts = vec![0; self.choices()];
        for &c in &self.history {
            if let Some(slot) = counts.get_mut(c) {
                *slot += 1;
            }
        }
        counts
    }

    pub fn summary(&self) -> SequenceSummary {
        SequenceSummary {
            observations: self.history.len(),
            predictions: self.predictions,
            correct: self.correct,
            choice_counts: self.choice_counts(),
            pattern_count: self.table.pattern_count(),
        }
    }

    fn label(&self, choice: usize) -> String {
        self.config
            .choice_labels
            .get(choice)
            .cloned()
            .unwrap_or_else(|| choice.to_string())
    }
}

impl Agent for SequencePredictor {
    type Observation = ();
    type Action = Guess;
    type Outcome = usize;

    fn decide(&mut self, _: &()) -> Guess {
        // Asked again before the last guess was resolved: repeat it.
        if let Some(pending) = self.pending {
            return pending;
        }
        let prediction = self.predict_next();
        let choice = match prediction {
            Some(p) => p.choice,
            None => self.rng.random_range(0..self.choices()),
        };
        let guess = Guess { prediction, choice };
        self.pending = Some(guess);
        guess
    }

    fn observe(&mut self, actual: usize) {
        if actual >= self.choices() {
            return;
        }
        if let Some(guess) = self.pending.take() {
            if let Some(p) = guess.prediction {
                self.predictions += 1;
                if p.choice == actual {
                    self.correct += 1;
                }
            }
        }
        self.record(actual);
    }

    fn insights(&self) -> Vec<Insight> {
        let mut insights = Vec::new();

        match self.predict_next() {
            Some(p) => insights.push(
                Insight::new("Expecting", self.label(p.choice)).with_confidence(p.ratio),
            ),
            None => insights.push(Insight::new("Expecting", "no pattern yet")),
        }

        if let Some(p) = self.predict_next() {
            insights.push(Insight::new("Pattern length", format!("{} throws", p.order)));
        }

        match self.accuracy() {
            Some(acc) => insights.push(
                Insight::new("Read accuracy", format!("{:.0}%", acc * 100.0)).with_confidence(acc),
            ),
            None => insights.push(Insight::new("Read accuracy", "no reads yet")),
        }

        insights.push(Insight::new("Throws seen", self.history.len().to_string()));
        insights
    }

    fn name(&self) -> &str {
        "Sequence predictor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictor() -> SequencePredictor {
        SequencePredictor::with_seed(SequenceConfig::default(), 11)
    }

    fn feed(p: &mut SequencePredictor, choices: &[usize]) {
        for &c in choices {
            p.record(c);
        }
    }

    #[test]
    fn alternating_sequence_predicts_the_next_entry() {
        let mut p = predictor();
        feed(&mut p, &[0, 1, 0, 1, 0]);
        let prediction = p.predict_next().expect("enough data at order 1");
        assert_eq!(prediction.choice, 1);
        p.record(1);

        let first = prediction.confidence;
        feed(&mut p, &[0]);
        let later = p.predict_next().unwrap();
        assert_eq!(later.choice, 1);
        assert!(
            later.confidence > first,
            "confidence should grow with repetitions: {first} -> {}",
            later.confidence
        );
    }

    #[test]
    fn thin_data_predicts_nothing() {
        let mut p = predictor();
        assert_eq!(p.predict_next(), None);
        feed(&mut p, &[0, 1]);
        assert_eq!(p.predict_next(), None);
        feed(&mut p, &[2]);
        assert_eq!(p.predict_next(), None);
    }

    #[test]
    fn orders_without_enough_history_are_skipped() {
        let mut p = predictor();
        p.learn(&[2], 0);
        p.learn(&[2], 0);
        // Only order 1 has data; a one-element history can still use it.
        let prediction = p.predict(&[2]).unwrap();
        assert_eq!(prediction.order, 1);
        assert_eq!(prediction.choice, 0);
    }

    #[test]
    fn higher_order_wins_with_equal_evidence() {
        let mut p = predictor();
        feed(&mut p, &[0, 1, 0, 1, 0, 1, 0]);
        let prediction = p.predict_next().unwrap();
        assert_eq!(prediction.choice, 1);
        assert_eq!(prediction.order, 3);
        assert!((prediction.confidence - 1.9).abs() < 1e-9);
    }

    #[test]
    fn exact_tie_goes_to_the_order_scanned_last() {
        let config = SequenceConfig {
            order_weight: 0.0,
            ..Default::default()
        };
        let mut p = SequencePredictor::with_seed(config, 1);
        feed(&mut p, &[0, 1, 0, 1, 0, 1, 0]);
        assert_eq!(p.predict_next().unwrap().order, 1);
    }

    #[test]
    fn strong_low_order_beats_weak_high_order() {
        let mut p = predictor();
        // Order 1 after `0`: always 1. Order 2 after `[2, 0]`: split.
        p.learn(&[5, 0], 1);
        for _ in 0..6 {
            p.learn(&[0], 1);
        }
        p.learn(&[2, 0], 1);
        p.learn(&[2, 0], 2);
        let prediction = p.predict(&[2, 0]).unwrap();
        assert_eq!(prediction.order, 1);
        assert_eq!(prediction.choice, 1);
    }

    #[test]
    fn modal_tie_picks_smallest_choice() {
        let mut p = predictor();
        p.learn(&[1], 2);
        p.learn(&[1], 0);
        let prediction = p.predict(&[1]).unwrap();
        assert_eq!(prediction.choice, 0);
        assert!((prediction.ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn counts_never_decrease() {
        let mut p = predictor();
        let mut previous = [0u64; 4];
        for c in [0, 2, 2, 1, 0, 2, 1, 1, 0, 0, 2] {
            p.record(c);
            for order in 1..=4 {
                let now = p.table().observations(order);
                assert!(now >= previous[order - 1]);
                previous[order - 1] = now;
            }
        }
        assert_eq!(p.table().observations(1), 10);
        assert_eq!(p.table().observations(4), 7);
    }

    #[test]
    fn reset_clears_everything() {
        let mut p = predictor();
        feed(&mut p, &[0, 0, 0, 0]);
        assert!(p.predict_next().is_some());
        p.reset();
        assert_eq!(p.table().pattern_count(), 0);
        assert!(p.history().is_empty());
        assert_eq!(p.predict_next(), None);
    }

    #[test]
    fn decide_falls_back_to_random_without_data() {
        let mut p = predictor();
        let guess = p.decide(&());
        assert!(guess.prediction.is_none());
        assert!(guess.choice < 3);
    }

    #[test]
    fn decide_repeats_guess_until_observed() {
        let mut p = predictor();
        feed(&mut p, &[2, 2, 2]);
        let first = p.decide(&());
        assert_eq!(first.choice, 2);
        assert_eq!(p.decide(&()), first);

        p.observe(2);
        assert_eq!(p.accuracy(), Some(1.0));
        p.observe(1); // no pending guess: recorded, not scored
        assert_eq!(p.summary().predictions, 1);
        assert_eq!(p.history().len(), 5);
    }

    #[test]
    fn out_of_range_choice_is_ignored() {
        let mut p = predictor();
        p.observe(7);
        assert!(p.history().is_empty());
    }

    #[test]
    fn insights_are_idempotent() {
        let mut a = predictor();
        let mut b = predictor();
        for p in [&mut a, &mut b] {
            feed(p, &[0, 1, 2]);
        }
        let first = a.insights();
        assert_eq!(first, a.insights());
        assert_eq!(a.decide(&()), b.decide(&()));
    }
}
