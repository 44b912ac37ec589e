//! Spatial targeting: learns where the player tends to be and where they are
//! heading, and mixes those into its choice of target point.

use std::ops::{Add, Mul, Sub};

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use super::agent::{Agent, Insight, InsightTone};

/// Velocity samples kept for trajectory prediction.
pub const VELOCITY_WINDOW: usize = 30;

/// Point or displacement on the playfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Clamp into the rectangle `[0, bounds.x] × [0, bounds.y]`.
    pub fn clamp_to(self, bounds: Vec2) -> Vec2 {
        Vec2::new(self.x.clamp(0.0, bounds.x), self.y.clamp(0.0, bounds.y))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Fixed-capacity circular buffer; the oldest entry is overwritten when full.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    buffer: [T; N],
    head: usize,
    len: usize,
}

impl<T: Default + Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + Copy, const N: usize> RingBuffer<T, N> {
    pub fn new() -> Self {
        RingBuffer {
            buffer: [T::default(); N],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        self.buffer[self.head] = item;
        self.head = (self.head + 1) % N;
        if self.len < N {
            self.len += 1;
        }
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The newest `count` items, newest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &T> + '_ {
        let take = count.min(self.len);
        (0..take).map(move |back| &self.buffer[(self.head + N - 1 - back) % N])
    }
}

/// Visit counts over a coarse grid laid across the playfield.
///
/// The cells always sum to [`total`](DensityGrid::total). That total mixes
/// positions observed this session with visits seeded from an earlier one;
/// [`recorded`](DensityGrid::recorded) and [`seeded`](DensityGrid::seeded)
/// report the two parts.
#[derive(Debug, Clone)]
pub struct DensityGrid {
    cols: usize,
    rows: usize,
    counts: Vec<u32>,
    total: u64,
    seeded: u64,
    field: Vec2,
}

impl DensityGrid {
    pub fn new(cols: usize, rows: usize, field: Vec2) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        DensityGrid {
            cols,
            rows,
            counts: vec![0; cols * rows],
            total: 0,
            seeded: 0,
            field,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Grid cell containing `pos`; positions outside the field map to the
    /// nearest edge cell.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cell_of(&self, pos: Vec2) -> (usize, usize) {
        let col = ((pos.x / self.field.x) * self.cols as f64)
            .floor()
            .clamp(0.0, (self.cols - 1) as f64) as usize;
        let row = ((pos.y / self.field.y) * self.rows as f64)
            .floor()
            .clamp(0.0, (self.rows - 1) as f64) as usize;
        (col, row)
    }

    pub fn cell_center(&self, col: usize, row: usize) -> Vec2 {
        let w = self.field.x / self.cols as f64;
        let h = self.field.y / self.rows as f64;
        Vec2::new((col as f64 + 0.5) * w, (row as f64 + 0.5) * h)
    }

    pub fn record(&mut self, pos: Vec2) {
        self.add(pos, 1);
    }

    /// Credit `weight` prior visits at `pos` in one step.
    pub fn seed(&mut self, pos: Vec2, weight: u32) {
        self.add(pos, weight);
        self.seeded += u64::from(weight);
    }

    fn add(&mut self, pos: Vec2, weight: u32) {
        let (col, row) = self.cell_of(pos);
        let slot = &mut self.counts[row * self.cols + col];
        *slot = slot.saturating_add(weight);
        self.total += u64::from(weight);
    }

    pub fn count(&self, col: usize, row: usize) -> u32 {
        self.counts.get(row * self.cols + col).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Visits that came from [`record`](DensityGrid::record).
    pub fn recorded(&self) -> u64 {
        self.total - self.seeded
    }

    pub fn seeded(&self) -> u64 {
        self.seeded
    }

    /// Most visited cell and its count. Ties go to the first cell in row-major
    /// order; `None` on an empty grid.
    pub fn hottest(&self) -> Option<(usize, usize, u32)> {
        if self.total == 0 {
            return None;
        }
        let (idx, &count) = self
            .counts
            .iter()
            .enumerate()
            .fold((0, &0u32), |best, cur| if cur.1 > best.1 { cur } else { best });
        Some((idx % self.cols, idx / self.cols, count))
    }

    /// Fraction of all visits that landed in the hottest cell.
    pub fn hottest_share(&self) -> f64 {
        match self.hottest() {
            Some((_, _, count)) => f64::from(count) / self.total as f64,
            None => 0.0,
        }
    }
}

/// Targeter parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargeterConfig {
    pub grid_cols: usize,
    pub grid_rows: usize,
    /// Velocities averaged for trajectory prediction.
    pub recent_velocities: usize,
    pub lookahead_ticks: f64,
    /// Samples needed for full adaptation.
    pub full_adaptation_samples: u64,
    /// Samples required before hotspot confidence becomes non-zero.
    pub hotspot_min_samples: u64,
    /// Jitter standard deviations as a fraction of the field size.
    pub predicted_jitter: f64,
    pub hotspot_jitter: f64,
    /// Visits credited to a hotspot carried over from a previous session.
    pub prior_weight: u32,
}

impl Default for TargeterConfig {
    fn default() -> Self {
        TargeterConfig {
            grid_cols: 12,
            grid_rows: 8,
            recent_velocities: 5,
            lookahead_ticks: 20.0,
            full_adaptation_samples: 300,
            hotspot_min_samples: 50,
            predicted_jitter: 0.03,
            hotspot_jitter: 0.08,
            prior_weight: 10,
        }
    }
}

/// How a target point was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetStrategy {
    Random,
    Current,
    Predicted,
    Hotspot,
}

impl TargetStrategy {
    pub const ALL: [TargetStrategy; 4] = [
        TargetStrategy::Random,
        TargetStrategy::Current,
        TargetStrategy::Predicted,
        TargetStrategy::Hotspot,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub point: Vec2,
    pub strategy: TargetStrategy,
}

/// Coarse numbers exported to the profile at session end.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialSummary {
    pub samples: u64,
    /// Hotspot center as a fraction of the field, in [0, 1]².
    pub hotspot: Option<Vec2>,
    pub hotspot_confidence: f64,
    /// Share of samples within the outer tenth of the field.
    pub edge_share: f64,
    pub mean_speed: f64,
}

/// Learns player position density and recent motion, then picks targets.
pub struct SpatialTargeter {
    config: TargeterConfig,
    field: Vec2,
    grid: DensityGrid,
    velocities: RingBuffer<Vec2, VELOCITY_WINDOW>,
    last_position: Option<Vec2>,
    samples: u64,
    edge_samples: u64,
    strategy_counts: [u32; 4],
    rng: StdRng,
}

impl SpatialTargeter {
    pub fn new(config: TargeterConfig, field: Vec2) -> Self {
        Self::with_rng(config, field, StdRng::from_os_rng())
    }

    pub fn with_seed(config: TargeterConfig, field: Vec2, seed: u64) -> Self {
        Self::with_rng(config, field, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: TargeterConfig, field: Vec2, rng: StdRng) -> Self {
        let field = Vec2::new(field.x.max(1.0), field.y.max(1.0));
        SpatialTargeter {
            grid: DensityGrid::new(config.grid_cols, config.grid_rows, field),
            config,
            field,
            velocities: RingBuffer::new(),
            last_position: None,
            samples: 0,
            edge_samples: 0,
            strategy_counts: [0; 4],
            rng,
        }
    }

    /// Credit a hotspot learned in an earlier session, given as a fraction of
    /// the field. The visits land in the grid's seeded share, so they shape
    /// the hotspot without counting toward [`samples`](Self::samples).
    pub fn seed_prior(&mut self, hotspot: Vec2) {
        if !hotspot.is_finite() || self.config.prior_weight == 0 {
            return;
        }
        let point = Vec2::new(hotspot.x * self.field.x, hotspot.y * self.field.y);
        self.grid.seed(point.clamp_to(self.field), self.config.prior_weight);
    }

    pub fn field(&self) -> Vec2 {
        self.field
    }

    pub fn grid(&self) -> &DensityGrid {
        &self.grid
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Record one player position sample.
    pub fn record(&mut self, position: Vec2) {
        if !position.is_finite() {
            return;
        }
        let position = position.clamp_to(self.field);
        if let Some(last) = self.last_position {
            self.velocities.push(position - last);
        }
        self.grid.record(position);
        if self.near_edge(position) {
            self.edge_samples += 1;
        }
        self.samples += 1;
        self.last_position = Some(position);
    }

    fn near_edge(&self, p: Vec2) -> bool {
        let mx = self.field.x * 0.1;
        let my = self.field.y * 0.1;
        p.x < mx || p.x > self.field.x - mx || p.y < my || p.y > self.field.y - my
    }

    fn mean_velocity(&self) -> Vec2 {
        let n = self.config.recent_velocities.max(1);
        let taken = self.velocities.recent(n).count();
        if taken == 0 {
            return Vec2::default();
        }
        let sum = self
            .velocities
            .recent(n)
            .fold(Vec2::default(), |acc, &v| acc + v);
        sum * (1.0 / taken as f64)
    }

    /// Where the player will be after the lookahead, extrapolating the mean
    /// of the most recent velocities. Field center before any sample.
    pub fn predict_future(&self) -> Vec2 {
        match self.last_position {
            Some(last) => {
                (last + self.mean_velocity() * self.config.lookahead_ticks).clamp_to(self.field)
            }
            None => self.field * 0.5,
        }
    }

    /// Fraction of full adaptation reached, in [0, 1].
    pub fn adaptation_level(&self) -> f64 {
        let full = self.config.full_adaptation_samples.max(1);
        (self.samples as f64 / full as f64).min(1.0)
    }

    pub fn hotspot(&self) -> Option<Vec2> {
        self.grid
            .hottest()
            .map(|(col, row, _)| self.grid.cell_center(col, row))
    }

    pub fn hotspot_confidence(&self) -> f64 {
        if self.samples <= self.config.hotspot_min_samples {
            return 0.0;
        }
        self.grid.hottest_share() * self.adaptation_level()
    }

    fn jitter(&mut self, center: Vec2, fraction: f64) -> Vec2 {
        let sx = (self.field.x * fraction).max(f64::EPSILON);
        let sy = (self.field.y * fraction).max(f64::EPSILON);
        let (Ok(nx), Ok(ny)) = (Normal::new(0.0, sx), Normal::new(0.0, sy)) else {
            return center;
        };
        center + Vec2::new(nx.sample(&mut self.rng), ny.sample(&mut self.rng))
    }

    fn random_point(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.random_range(0.0..=self.field.x),
            self.rng.random_range(0.0..=self.field.y),
        )
    }

    /// Strategy weights for the current adaptation level.
    pub fn weights(&self) -> [f64; 4] {
        let a = self.adaptation_level();
        let hotspot = if self.hotspot().is_some() { 0.35 * a } else { 0.0 };
        [1.0 - 0.85 * a, 0.2, 0.5 * a, hotspot]
    }

    /// Pick a target point. Early on this is mostly random; as samples
    /// accumulate the predicted position and hotspot take over.
    pub fn choose_target(&mut self, current: Vec2) -> Target {
        let strategy = match WeightedIndex::new(self.weights()) {
            Ok(dist) => TargetStrategy::ALL[dist.sample(&mut self.rng)],
            Err(_) => TargetStrategy::Random,
        };

        let point = match strategy {
            TargetStrategy::Random => self.random_point(),
            TargetStrategy::Current => current,
            TargetStrategy::Predicted => {
                let predicted = self.predict_future();
                self.jitter(predicted, self.config.predicted_jitter)
            }
            TargetStrategy::Hotspot => match self.hotspot() {
                Some(hot) => self.jitter(hot, self.config.hotspot_jitter),
                None => self.random_point(),
            },
        };

        self.strategy_counts[strategy.index()] += 1;
        Target {
            point: if point.is_finite() {
                point.clamp_to(self.field)
            } else {
                self.field * 0.5
            },
            strategy,
        }
    }

    pub fn summary(&self) -> SpatialSummary {
        let hotspot = match self.grid.hottest() {
            Some(_) if self.samples > 0 => self
                .hotspot()
                .map(|h| Vec2::new(h.x / self.field.x, h.y / self.field.y)),
            _ => None,
        };
        let edge_share = if self.samples == 0 {
            0.0
        } else {
            self.edge_samples as f64 / self.samples as f64
        };
        let speeds: Vec<f64> = self
            .velocities
            .recent(VELOCITY_WINDOW)
            .map(|v| v.length())
            .collect();
        let mean_speed = if speeds.is_empty() {
            0.0
        } else {
            speeds.iter().sum::<f64>() / speeds.len() as f64
        };
        SpatialSummary {
            samples: self.samples,
            hotspot,
            hotspot_confidence: self.hotspot_confidence(),
            edge_share,
            mean_speed,
        }
    }

    /// Coarse name for the ninth of the field containing `point`.
    pub fn zone_of(&self, point: Vec2) -> &'static str {
        let col = ((point.x / self.field.x) * 3.0).floor().clamp(0.0, 2.0) as usize;
        let row = ((point.y / self.field.y) * 3.0).floor().clamp(0.0, 2.0) as usize;
        const ZONES: [[&str; 3]; 3] = [
            ["top left", "top", "top right"],
            ["left", "center", "right"],
            ["bottom left", "bottom", "bottom right"],
        ];
        ZONES[row][col]
    }
}

impl Agent for SpatialTargeter {
    /// The player's current position.
    type Observation = Vec2;
    type Action = Target;
    /// A sampled player position.
    type Outcome = Vec2;

    fn decide(&mut self, current: &Vec2) -> Target {
        self.choose_target(*current)
    }

    fn observe(&mut self, position: Vec2) {
        self.record(position);
    }

    fn insights(&self) -> Vec<Insight> {
        let adaptation = self.adaptation_level();
        let mut insights = vec![Insight::new(
            "Reading your movement",
            format!("{:.0}%", adaptation * 100.0),
        )
        .with_confidence(adaptation)];

        let confidence = self.hotspot_confidence();
        match self.hotspot() {
            Some(hot) if confidence > 0.0 => insights.push(
                Insight::new("Favorite spot", self.zone_of(hot)).with_confidence(confidence),
            ),
            _ => insights.push(
                Insight::new("Favorite spot", "still looking").with_tone(InsightTone::Neutral),
            ),
        }

        if self.last_position.is_some() {
            let heading = self.predict_future();
            insights.push(Insight::new("Heading toward", self.zone_of(heading)));
        }

        let total: u32 = self.strategy_counts.iter().sum();
        if total > 0 {
            let aimed = self.strategy_counts[TargetStrategy::Predicted.index()]
                + self.strategy_counts[TargetStrategy::Hotspot.index()];
            let share = f64::from(aimed) / f64::from(total);
            insights.push(
                Insight::new("Aimed shots", format!("{:.0}%", share * 100.0))
                    .with_confidence(share),
            );
        }

        insights
    }

    fn name(&self) -> &str {
        "Spatial targeter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELD: Vec2 = Vec2::new(120.0, 80.0);

    fn targeter() -> SpatialTargeter {
        SpatialTargeter::with_seed(TargeterConfig::default(), FIELD, 5)
    }

    #[test]
    fn ring_buffer_overwrites_oldest() {
        let mut buf: RingBuffer<u32, 3> = RingBuffer::new();
        assert!(buf.is_empty());
        for i in 1..=5 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        let recent: Vec<u32> = buf.recent(10).copied().collect();
        assert_eq!(recent, vec![5, 4, 3]);
        let two: Vec<u32> = buf.recent(2).copied().collect();
        assert_eq!(two, vec![5, 4]);
    }

    #[test]
    fn grid_counts_sum_to_total() {
        let mut grid = DensityGrid::new(12, 8, FIELD);
        for i in 0..57 {
            let f = i as f64;
            grid.record(Vec2::new((f * 7.3) % 130.0 - 5.0, (f * 3.1) % 90.0));
        }
        let (cols, rows) = grid.dimensions();
        let sum: u64 = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (c, r)))
            .map(|(c, r)| u64::from(grid.count(c, r)))
            .sum();
        assert_eq!(sum, grid.total());
        assert_eq!(grid.total(), 57);
    }

    #[test]
    fn out_of_field_positions_clamp_to_edge_cells() {
        let grid = DensityGrid::new(12, 8, FIELD);
        assert_eq!(grid.cell_of(Vec2::new(-10.0, -10.0)), (0, 0));
        assert_eq!(grid.cell_of(Vec2::new(500.0, 500.0)), (11, 7));
        assert_eq!(grid.cell_of(FIELD), (11, 7));
    }

    #[test]
    fn hotspot_confidence_grows_with_repeated_samples() {
        let mut t = targeter();
        let spot = Vec2::new(15.0, 15.0);
        for _ in 0..10 {
            t.record(spot);
        }
        let early = t.hotspot_confidence();
        assert_eq!(early, 0.0);

        for _ in 10..100 {
            t.record(spot);
        }
        let later = t.hotspot_confidence();
        assert!(later > early);
        assert_eq!(t.grid().cell_of(t.hotspot().unwrap()), t.grid().cell_of(spot));
        assert!((later - 100.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn adaptation_is_monotonic_and_saturates() {
        let mut t = targeter();
        let mut previous = t.adaptation_level();
        for i in 0..400 {
            t.record(Vec2::new(i as f64 % 120.0, 40.0));
            let now = t.adaptation_level();
            assert!(now >= previous);
            previous = now;
        }
        assert_eq!(previous, 1.0);
    }

    #[test]
    fn predicts_along_recent_motion() {
        let mut t = targeter();
        assert_eq!(t.predict_future(), Vec2::new(60.0, 40.0));
        for i in 0..10 {
            t.record(Vec2::new(10.0 + i as f64, 40.0));
        }
        let predicted = t.predict_future();
        assert!((predicted.x - 39.0).abs() < 1e-9);
        assert!((predicted.y - 40.0).abs() < 1e-9);

        for i in 0..10 {
            t.record(Vec2::new(100.0 + 2.0 * i as f64, 40.0));
        }
        assert_eq!(t.predict_future().x, FIELD.x);
    }

    #[test]
    fn cold_targeter_never_aims() {
        let mut t = targeter();
        for _ in 0..200 {
            let target = t.choose_target(Vec2::new(30.0, 30.0));
            assert!(matches!(
                target.strategy,
                TargetStrategy::Random | TargetStrategy::Current
            ));
            assert!(target.point.x >= 0.0 && target.point.x <= FIELD.x);
            assert!(target.point.y >= 0.0 && target.point.y <= FIELD.y);
        }
    }

    #[test]
    fn adapted_targeter_clusters_on_a_camping_player() {
        let mut t = targeter();
        let spot = t.grid().cell_center(2, 2);
        for _ in 0..400 {
            t.record(spot);
        }
        let near = (0..300)
            .map(|_| t.choose_target(spot))
            .filter(|target| (target.point - spot).length() < 25.0)
            .count();
        assert!(near > 200, "only {near} of 300 targets near the player");
    }

    #[test]
    fn prior_hotspot_seeds_grid_but_not_adaptation() {
        let mut t = targeter();
        t.seed_prior(Vec2::new(0.9, 0.1));
        assert_eq!(t.samples(), 0);
        assert_eq!(t.adaptation_level(), 0.0);
        assert_eq!(t.hotspot_confidence(), 0.0);
        let hot = t.hotspot().unwrap();
        assert!(hot.x > 100.0 && hot.y < 10.0);
    }

    #[test]
    fn grid_total_splits_into_recorded_and_seeded() {
        let mut t = targeter();
        let prior = u64::from(TargeterConfig::default().prior_weight);
        t.seed_prior(Vec2::new(0.5, 0.5));
        for i in 0..25 {
            t.record(Vec2::new(10.0 + i as f64, 40.0));
        }
        let grid = t.grid();
        assert_eq!(grid.seeded(), prior);
        assert_eq!(grid.recorded(), t.samples());
        assert_eq!(grid.total(), t.samples() + prior);

        let (cols, rows) = grid.dimensions();
        let sum: u64 = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| u64::from(grid.count(c, r))))
            .sum();
        assert_eq!(sum, grid.total());
    }

    #[test]
    fn summary_reports_edge_habits() {
        let mut t = targeter();
        for i in 0..20 {
            t.record(Vec2::new(2.0, i as f64 * 4.0));
        }
        let summary = t.summary();
        assert_eq!(summary.samples, 20);
        assert_eq!(summary.edge_share, 1.0);
        assert!(summary.mean_speed > 0.0);
    }

    #[test]
    fn insights_are_idempotent() {
        let mut a = targeter();
        let mut b = targeter();
        for t in [&mut a, &mut b] {
            for i in 0..60 {
                t.record(Vec2::new(20.0, 10.0 + (i % 3) as f64));
            }
        }
        let first = a.insights();
        assert_eq!(first, a.insights());
        assert_eq!(a.decide(&Vec2::new(5.0, 5.0)), b.decide(&Vec2::new(5.0, 5.0)));
    }
}
