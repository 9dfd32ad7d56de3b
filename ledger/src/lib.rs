//! Election ledger.
//!
//! An administrator authorizes election creators; creators open elections
//! with a fixed voting window; anyone registers candidates and casts at most
//! one vote per election. Tallies are kept incrementally and are always equal
//! to the recorded votes.

pub mod access;
pub mod candidate;
pub mod election;
pub mod error;
pub mod event;
pub mod ledger;
pub mod results;
pub mod sequence;
pub mod snapshot;
pub mod vote;

pub use access::AccessControl;
pub use candidate::{Candidate, CandidateRegistration, CandidateRegistry};
pub use election::{Election, ElectionDraft, ElectionRegistry, ElectionStatus};
pub use error::LedgerError;
pub use event::{EventBus, LedgerEvent};
pub use ledger::{Ledger, LedgerPolicy};
pub use results::{ElectionResults, ResultEngine, Standing};
pub use snapshot::{CandidateList, LedgerSnapshot, SNAPSHOT_VERSION};
pub use vote::{VoteLedger, VoteRecord};
