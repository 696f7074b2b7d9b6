pub mod client;
mod record;
pub mod store;

use sqlx::migrate::Migrator;

/// Versioned schema, embedded from `readit-db/migrations`.
pub static MIGRATOR: Migrator = sqlx::migrate!();
