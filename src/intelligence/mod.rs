/// Intelligence module
///
/// Pattern analysis over interaction history and the predictive model
/// built on top of it.

pub mod context;
pub mod pattern_analyzer;
pub mod predictive_model;
pub mod scorer;

pub use context::{ContextDetector, DayOfWeek, InteractionContext, ProjectType, TimeOfDay};
pub use pattern_analyzer::{PatternAnalyzer, RepeatedSequence, TemporalAffinity};
pub use predictive_model::{
    suggest_workflow_name, AutomationOpportunity, ModelStatistics, PredictiveModel,
    WorkflowPrediction,
};
pub use scorer::Scorer;
