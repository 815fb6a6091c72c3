//! Property-management back office data layer: a SQLite schema with
//! declared referential integrity, replay-safe migrations that track nothing
//! and introspect everything, generic record accessors over canonical
//! snake_case names, and the join resolver behind document-export views.

pub mod accessors;
pub mod audit;
pub mod db;
pub mod error;
pub mod id;
pub mod lease;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod rules;
pub mod schema;
pub mod settings;
pub mod time;

pub use error::{AppError, AppResult};
pub use rules::IntegrityRules;
