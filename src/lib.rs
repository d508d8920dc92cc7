/// flowsense library
///
/// Predictive workflow suggestions: an append-only interaction store, a
/// pattern analyzer over it, and a predictive model with an adaptive
/// confidence threshold.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod intelligence;

// Re-exports for convenience
pub use config::ModelConfig;
pub use db::Database;
pub use error::{FlowsenseError, Result};
