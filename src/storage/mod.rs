mod repository;

pub use repository::*;

/// Budgets and expenses tables
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");
