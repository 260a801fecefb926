//! Read-only row cursors over a legacy revision-tree SQLite file.

mod open;
mod models;
mod query;
mod schema;

pub use open::{register_revid_collation, LegacyDb};
pub use models::*;
pub use schema::{LEGACY_SCHEMA, LEGACY_TABLES, MAX_SCHEMA_VERSION, MIN_SCHEMA_VERSION};
