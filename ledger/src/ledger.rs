//! The ledger facade: one lock over all state, one clock, one event bus.
//!
//! Every operation takes the caller's identity explicitly. Mutations run
//! under the write lock from first check to last write, so concurrent votes
//! never interleave a check with another vote's write. Events are emitted
//! after the lock is released.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use ballot_types::{CandidateId, Clock, ElectionId, Identity, Timestamp};

use crate::access::AccessControl;
use crate::candidate::{Candidate, CandidateRegistration, CandidateRegistry};
use crate::election::{Election, ElectionDraft, ElectionRegistry, ElectionStatus};
use crate::error::LedgerError;
use crate::event::{EventBus, LedgerEvent};
use crate::results::{ElectionResults, ResultEngine, Standing};
use crate::snapshot::LedgerSnapshot;
use crate::vote::VoteLedger;

/// Tunable rules that are not fixed by the ledger's invariants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerPolicy {
    pub candidate_registration: CandidateRegistration,
}

pub(crate) struct LedgerState {
    pub(crate) access: AccessControl,
    pub(crate) elections: ElectionRegistry,
    pub(crate) candidates: CandidateRegistry,
    pub(crate) votes: VoteLedger,
}

impl LedgerState {
    fn new(administrator: Identity) -> Self {
        Self {
            access: AccessControl::new(administrator),
            elections: ElectionRegistry::new(),
            candidates: CandidateRegistry::new(),
            votes: VoteLedger::new(),
        }
    }

    fn results(&self) -> ResultEngine<'_> {
        ResultEngine::new(&self.elections, &self.candidates)
    }
}

pub struct Ledger {
    state: RwLock<LedgerState>,
    events: RwLock<EventBus>,
    clock: Arc<dyn Clock>,
    policy: LedgerPolicy,
}

impl Ledger {
    pub fn new(administrator: Identity, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        Self::with_policy(administrator, clock, LedgerPolicy::default())
    }

    /// Fails with `EmptyField` when `administrator` is blank; there is no way
    /// to assign one later.
    pub fn with_policy(
        administrator: Identity,
        clock: Arc<dyn Clock>,
        policy: LedgerPolicy,
    ) -> Result<Self, LedgerError> {
        if !administrator.is_valid() {
            return Err(LedgerError::EmptyField("administrator"));
        }
        tracing::info!(administrator = %administrator, "ledger initialized");
        Ok(Self::from_state(LedgerState::new(administrator), clock, policy))
    }

    /// Rebuild a ledger from a snapshot, validating it first.
    pub fn restore(
        snapshot: LedgerSnapshot,
        clock: Arc<dyn Clock>,
        policy: LedgerPolicy,
    ) -> Result<Self, LedgerError> {
        let state = snapshot
            .into_state()
            .inspect_err(|e| tracing::warn!(error = %e, "snapshot rejected"))?;
        tracing::debug!(elections = state.elections.count(), "ledger restored");
        Ok(Self::from_state(state, clock, policy))
    }

    fn from_state(state: LedgerState, clock: Arc<dyn Clock>, policy: LedgerPolicy) -> Self {
        Self {
            state: RwLock::new(state),
            events: RwLock::new(EventBus::new()),
            clock,
            policy,
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::capture(&self.read())
    }

    /// Register an event listener. Listeners must not subscribe from inside
    /// a callback.
    pub fn subscribe(&self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(listener);
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // Access control

    pub fn administrator(&self) -> Identity {
        self.read().access.administrator().clone()
    }

    pub fn is_authorized(&self, identity: &Identity) -> bool {
        self.read().access.is_authorized(identity)
    }

    pub fn authorized_creators(&self) -> Vec<Identity> {
        self.read().access.creators()
    }

    /// Returns whether the creator set changed. Idempotent.
    pub fn authorize_creator(&self, caller: &Identity, target: &Identity) -> Result<bool, LedgerError> {
        require_identity(caller, "authorize election creators")?;
        let changed = self
            .write()
            .access
            .authorize(caller, target)
            .inspect_err(|e| tracing::debug!(error = %e, "authorize rejected"))?;
        if changed {
            tracing::info!(target_identity = %target, "creator authorized");
            self.emit(LedgerEvent::CreatorAuthorized {
                target: target.clone(),
            });
        }
        Ok(changed)
    }

    /// Returns whether the creator set changed. Idempotent.
    pub fn revoke_creator(&self, caller: &Identity, target: &Identity) -> Result<bool, LedgerError> {
        require_identity(caller, "revoke election creators")?;
        let changed = self
            .write()
            .access
            .revoke(caller, target)
            .inspect_err(|e| tracing::debug!(error = %e, "revoke rejected"))?;
        if changed {
            tracing::info!(target_identity = %target, "creator revoked");
            self.emit(LedgerEvent::CreatorRevoked {
                target: target.clone(),
            });
        }
        Ok(changed)
    }

    // Elections

    pub fn create_election(
        &self,
        caller: &Identity,
        title: impl Into<String>,
        description: impl Into<String>,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Result<ElectionId, LedgerError> {
        require_identity(caller, "create elections")?;
        let draft = ElectionDraft {
            title: title.into(),
            description: description.into(),
            start_time,
            end_time,
        };
        let event_title = draft.title.clone();

        let id = {
            let mut state = self.write();
            let now = self.clock.now();
            let LedgerState {
                access, elections, ..
            } = &mut *state;
            elections
                .create(access, caller, draft, now)
                .inspect_err(|e| tracing::debug!(error = %e, "election rejected"))?
        };

        self.emit(LedgerEvent::ElectionCreated {
            election_id: id,
            title: event_title,
            creator: caller.clone(),
            start_time,
            end_time,
        });
        Ok(id)
    }

    /// Flip an election's active flag. Returns the new value.
    pub fn toggle_active(&self, caller: &Identity, election_id: ElectionId) -> Result<bool, LedgerError> {
        let active = {
            let mut state = self.write();
            let LedgerState {
                access, elections, ..
            } = &mut *state;
            elections
                .toggle_active(access, caller, election_id)
                .inspect_err(|e| tracing::debug!(error = %e, "toggle rejected"))?
        };
        self.emit(LedgerEvent::ElectionToggled {
            election_id,
            active,
        });
        Ok(active)
    }

    pub fn election(&self, election_id: ElectionId) -> Result<Election, LedgerError> {
        self.read().elections.get(election_id).cloned()
    }

    /// Every election, in id order.
    pub fn elections(&self) -> Vec<Election> {
        self.read().elections.iter().cloned().collect()
    }

    pub fn election_count(&self) -> u64 {
        self.read().elections.count()
    }

    pub fn is_votable(&self, election_id: ElectionId) -> Result<bool, LedgerError> {
        self.read().elections.is_votable(election_id, self.clock.now())
    }

    pub fn status(&self, election_id: ElectionId) -> Result<ElectionStatus, LedgerError> {
        self.read().elections.status(election_id, self.clock.now())
    }

    // Candidates

    pub fn add_candidate(
        &self,
        caller: &Identity,
        election_id: ElectionId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<CandidateId, LedgerError> {
        require_identity(caller, "add candidates")?;
        let name = name.into();
        let event_name = name.clone();

        let candidate_id = {
            let mut state = self.write();
            let LedgerState {
                access,
                elections,
                candidates,
                ..
            } = &mut *state;
            candidates
                .add_candidate(
                    elections,
                    access,
                    self.policy.candidate_registration,
                    caller,
                    election_id,
                    name,
                    description.into(),
                )
                .inspect_err(|e| tracing::debug!(error = %e, "candidate rejected"))?
        };

        self.emit(LedgerEvent::CandidateAdded {
            election_id,
            candidate_id,
            name: event_name,
        });
        Ok(candidate_id)
    }

    /// Candidates in registration order.
    pub fn candidates(&self, election_id: ElectionId) -> Result<Vec<Candidate>, LedgerError> {
        let state = self.read();
        Ok(state.candidates.list(&state.elections, election_id)?.to_vec())
    }

    // Votes

    pub fn cast_vote(
        &self,
        caller: &Identity,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Result<(), LedgerError> {
        require_identity(caller, "cast votes")?;
        {
            let mut state = self.write();
            let now = self.clock.now();
            let LedgerState {
                elections,
                candidates,
                votes,
                ..
            } = &mut *state;
            votes
                .cast_vote(elections, candidates, caller, election_id, candidate_id, now)
                .inspect_err(|e| tracing::debug!(error = %e, "vote rejected"))?;
        }

        self.emit(LedgerEvent::VoteCast {
            election_id,
            candidate_id,
            voter: caller.clone(),
        });
        Ok(())
    }

    pub fn has_voted(&self, election_id: ElectionId, voter: &Identity) -> Result<bool, LedgerError> {
        let state = self.read();
        state.votes.has_voted(&state.elections, election_id, voter)
    }

    /// The candidate `voter` chose.
    pub fn choice_of(&self, election_id: ElectionId, voter: &Identity) -> Result<CandidateId, LedgerError> {
        let state = self.read();
        state.votes.choice_of(&state.elections, election_id, voter)
    }

    // Results

    pub fn results(&self, election_id: ElectionId) -> Result<ElectionResults, LedgerError> {
        self.read().results().results(election_id)
    }

    pub fn winner(&self, election_id: ElectionId) -> Result<Candidate, LedgerError> {
        self.read().results().winner(election_id)
    }

    pub fn standings(&self, election_id: ElectionId) -> Result<Vec<Standing>, LedgerError> {
        self.read().results().standings(election_id)
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: LedgerEvent) {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .emit(&event);
    }
}

fn require_identity(caller: &Identity, action: &'static str) -> Result<(), LedgerError> {
    if caller.is_valid() {
        Ok(())
    } else {
        Err(LedgerError::Unauthorized {
            caller: caller.clone(),
            action,
        })
    }
}
