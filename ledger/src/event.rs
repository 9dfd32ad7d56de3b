//! Events emitted after ledger mutations commit.

use ballot_types::{CandidateId, ElectionId, Identity, Timestamp};
use serde::Serialize;

/// Ledger-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A new election was stored.
    ElectionCreated {
        election_id: ElectionId,
        title: String,
        creator: Identity,
        start_time: Timestamp,
        end_time: Timestamp,
    },
    /// A vote was recorded and counted.
    VoteCast {
        election_id: ElectionId,
        candidate_id: CandidateId,
        voter: Identity,
    },
    CandidateAdded {
        election_id: ElectionId,
        candidate_id: CandidateId,
        name: String,
    },
    /// The administrative switch was flipped; `active` is the new value.
    ElectionToggled { election_id: ElectionId, active: bool },
    CreatorAuthorized { target: Identity },
    CreatorRevoked { target: Identity },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::ElectionCreated { .. } => "election_created",
            LedgerEvent::VoteCast { .. } => "vote_cast",
            LedgerEvent::CandidateAdded { .. } => "candidate_added",
            LedgerEvent::ElectionToggled { .. } => "election_toggled",
            LedgerEvent::CreatorAuthorized { .. } => "creator_authorized",
            LedgerEvent::CreatorRevoked { .. } => "creator_revoked",
        }
    }
}

type Listener = Box<dyn Fn(&LedgerEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the emitting thread, in subscription order. The
/// ledger never holds its state lock while emitting, so a listener may read
/// the ledger back.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &LedgerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
