//! Durable per-asset processing state.
//!
//! A single JSON document maps each source file (by canonical path) to its
//! latest `AssetRecord`. Every mutation is written through immediately with a
//! temp-file-then-rename, so a run killed at any point leaves a parseable
//! document whose records are at most one transition behind.
//!
//! The store assumes it is the only writer: concurrent runs against the same
//! workspace are not supported and no lock is taken.

mod error;
mod store;
mod types;

pub use error::StateError;
pub use store::StateStore;
pub use types::{AssetRecord, AssetStatus, StateDocument, StateSummary, STATE_VERSION};
