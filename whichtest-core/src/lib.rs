//! whichtest core library - statistical test selection and assumption checking

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Decisions are pure functions of an immutable InputSpec
// - No global mutable state
// - No randomness, clocks, threads, or async
// - Every TestId has a catalog entry, an alternative decision, and a checker
// - A pending assumption check never counts as a failure
// - Identical input yields byte-for-byte identical output

mod choice;

pub mod assumptions;
pub mod catalog;
pub mod config;
pub mod content;
pub mod controller;
pub mod dataset;
pub mod decision;
pub mod error;
pub mod fallback;
pub mod input;
pub mod report;

pub use assumptions::{
    AssumptionChecker, AssumptionVerdict, CheckReport, CheckerRegistry, Selections,
};
pub use catalog::{Fallback, TestCatalog, TestId};
pub use config::ResolvedConfig;
pub use controller::{SelectionController, SelectionState};
pub use dataset::Dataset;
pub use decision::{recommend, DecisionEngine, Recommendation};
pub use fallback::FallbackResolver;
pub use input::InputSpec;

#[cfg(test)]
pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
