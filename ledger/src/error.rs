use ballot_types::{CandidateId, ElectionId, Identity, Timestamp};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        caller: Identity,
        action: &'static str,
    },

    #[error("election {0} not found")]
    NotFound(ElectionId),

    #[error("candidate {candidate} does not exist in election {election}")]
    CandidateNotFound {
        election: ElectionId,
        candidate: CandidateId,
    },

    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    #[error("invalid time window: start {start} must be after now ({now}) and before end {end}")]
    InvalidTimeWindow {
        start: Timestamp,
        end: Timestamp,
        now: Timestamp,
    },

    #[error("election {0} is not open for voting")]
    NotVotable(ElectionId),

    #[error("{voter} has already voted in election {election}")]
    AlreadyVoted {
        election: ElectionId,
        voter: Identity,
    },

    #[error("election {0} has no candidates")]
    NoCandidates(ElectionId),

    #[error("{voter} has not voted in election {election}")]
    NoVote {
        election: ElectionId,
        voter: Identity,
    },

    #[error("snapshot error: {0}")]
    Snapshot(String),
}
