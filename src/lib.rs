// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ai;
pub mod api;
pub mod caption;
pub mod compose;
pub mod config;
pub mod feeds;
pub mod fingerprint;
pub mod illustrate;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod rotation;
pub mod scheduler;
pub mod select;
pub mod telegram;
pub mod topics;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::ledger::SeenLedger;
pub use crate::pipeline::{CycleOutcome, Services, Variant};
pub use crate::rotation::{RotationKind, RotationStore};
