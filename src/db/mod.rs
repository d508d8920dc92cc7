/// Database module for flowsense
///
/// Durable, append-only storage for interactions and prediction feedback
/// using SQLite and sqlx. The in-memory store and model are rehydrated
/// from here at startup.

pub mod connection;
pub mod models;
pub mod queries;

pub use connection::{Database, DatabaseStats};
pub use models::*;
