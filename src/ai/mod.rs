//! The five adaptive opponents and the trait they share.

mod agent;
pub mod adaptive_search;
pub mod recall;
pub mod sequence;
pub mod spatial;
pub mod value_learning;

pub use adaptive_search::{
    AdaptiveHeuristic, AdaptiveSearchAgent, ColumnWeights, SearchConfig, SearchFeedback,
    SearchReport, SearchSummary,
};
pub use agent::{Agent, Insight, InsightTone};
pub use recall::{
    DifficultyTier, RecallConfig, RecallCounter, RecallDifficultyController, RecallEvent,
    RecallItem, RecallSummary, RoundReport, TierChange, TierParams,
};
pub use sequence::{Guess, NGramTable, Prediction, SequenceConfig, SequencePredictor, SequenceSummary};
pub use spatial::{
    DensityGrid, RingBuffer, SpatialSummary, SpatialTargeter, Target, TargetStrategy,
    TargeterConfig, Vec2,
};
pub use value_learning::{
    CourtView, DiscretizedState, PaddleMove, PolicySource, Reward, ValueLearningAgent,
    ValueLearningConfig, ValueSummary, ValueTable,
};
