//! # Wander Testkit
//!
//! Deterministic doubles for the collaborator effect traits, plus fixture
//! builders for ids, API responses, and push events. Everything here is
//! driven explicitly by the test: the clock moves when told, the API
//! answers from a script, and the bus delivers only what a test publishes.
//!
//! Lives outside `#[cfg(test)]` so integration tests and doctests across
//! the workspace share one set of doubles.

#![forbid(unsafe_code)]

// === Modules ===

/// Scripted engagement API double
pub mod api;
/// In-process realtime bus double
pub mod bus;
/// Manually driven clock
pub mod clock;
/// Deterministic ids, responses, and events
pub mod fixtures;
/// Tracing setup for tests
pub mod logging;

// === Public API Re-exports ===

pub use api::ScriptedApi;
pub use bus::ScriptedBus;
pub use clock::ManualClock;
pub use logging::init_test_logging;
