/// Core storage for the predictive model
///
/// The append-only interaction store, the sanitized action log, and the
/// workflow catalog the model ranks.

pub mod action_log;
pub mod catalog;
pub mod interaction_store;

pub use action_log::{ActionLog, RecordedAction};
pub use catalog::WorkflowCatalog;
pub use interaction_store::{hour_distance, InteractionStore, Snapshot};
