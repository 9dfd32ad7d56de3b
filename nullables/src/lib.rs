//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of the ledger are abstracted behind traits in
//! `ballot-types`. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;

pub use clock::NullClock;
