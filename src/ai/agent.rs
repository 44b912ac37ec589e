use serde::{Deserialize, Serialize};

/// Color hint for an insight line. Purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsightTone {
    /// Nothing learned yet.
    Neutral,
    /// Collecting data, not yet confident.
    Learning,
    /// A tendency has been found and is being exploited.
    Confident,
}

impl InsightTone {
    /// Tone for a confidence ratio in [0, 1].
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.6 {
            InsightTone::Confident
        } else if confidence > 0.0 {
            InsightTone::Learning
        } else {
            InsightTone::Neutral
        }
    }
}

/// One human-readable line describing an agent's learned state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub label: String,
    pub value: String,
    pub confidence: Option<f64>,
    pub tone: InsightTone,
}

impl Insight {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Insight {
            label: label.into(),
            value: value.into(),
            confidence: None,
            tone: InsightTone::Neutral,
        }
    }

    /// Attach a confidence ratio, clamped to [0, 1], and derive the tone from it.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.confidence = Some(confidence);
        self.tone = InsightTone::from_confidence(confidence);
        self
    }

    pub fn with_tone(mut self, tone: InsightTone) -> Self {
        self.tone = tone;
        self
    }
}

/// Universal interface for the adaptive opponents.
///
/// The owning game feeds the current observable state to `decide`, applies
/// the returned action, and reports what happened through `observe` once the
/// outcome is known.
pub trait Agent {
    type Observation;
    type Action;
    type Outcome;

    /// Pick an action for the current state. Never fails: with too little
    /// data the agent falls back to a built-in baseline.
    fn decide(&mut self, observation: &Self::Observation) -> Self::Action;

    /// Fold an outcome into the learned model.
    fn observe(&mut self, outcome: Self::Outcome);

    /// Snapshot of the learned state for display. Must not mutate anything.
    fn insights(&self) -> Vec<Insight>;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}
