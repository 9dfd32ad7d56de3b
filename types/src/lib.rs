//! Fundamental types for the election ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! caller identities, election and candidate ids, timestamps, and the clock abstraction.

pub mod id;
pub mod identity;
pub mod time;

pub use id::{CandidateId, ElectionId};
pub use identity::Identity;
pub use time::{Clock, SystemClock, Timestamp};
