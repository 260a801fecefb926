//! SQLite-backed document store that receives upgraded revision trees.

mod open;
mod models;
mod insert;
mod query;
mod schema;

pub use open::{encode_digest, DocStore, IDENTITY_KEYS};
pub use models::*;
