//! Deterministic random number generation
//!
//! Every run owns exactly one `RngManager`, seeded at construction.
//! CRITICAL: All randomness in a run MUST go through its manager, never a
//! thread-local or global generator, so that repetitions stay reproducible
//! and can execute on separate threads.

mod manager;

pub use manager::{derive_seed, RngManager};
