//! Core types and collaborator traits shared by the upgrade pipeline.

pub mod error;
pub mod model;
pub mod revid;
pub mod store;

pub use error::{FailureKind, Location, Result, UpgradeError};
pub use model::*;
pub use store::{DigestEncoder, DocumentStore, LegacySource, RevisionSink};

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
