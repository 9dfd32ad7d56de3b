//! Per-election candidate lists.

use crate::access::AccessControl;
use crate::election::ElectionRegistry;
use crate::error::LedgerError;
use crate::sequence::IdSequence;
use ballot_types::{CandidateId, ElectionId, Identity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub description: String,
    /// Written only by the vote ledger, only upward.
    pub vote_count: u64,
}

/// Who may register candidates on an existing election.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRegistration {
    /// Any caller.
    #[default]
    Open,
    /// The election's creator or the administrator.
    CreatorOnly,
}

/// Candidates of one election plus its id allocator.
struct Slate {
    candidates: Vec<Candidate>,
    ids: IdSequence,
}

impl Slate {
    fn new() -> Self {
        Self {
            candidates: Vec::new(),
            ids: IdSequence::starting_at(0),
        }
    }
}

#[derive(Default)]
pub struct CandidateRegistry {
    slates: HashMap<ElectionId, Slate>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from per-election lists whose ids are already known to be
    /// contiguous from 0.
    pub(crate) fn from_parts(lists: Vec<(ElectionId, Vec<Candidate>)>) -> Self {
        let slates = lists
            .into_iter()
            .map(|(election, candidates)| {
                let ids = IdSequence::starting_at(candidates.len() as u64);
                (election, Slate { candidates, ids })
            })
            .collect();
        Self { slates }
    }

    /// Register a candidate and append its id to the election's sequence.
    #[allow(clippy::too_many_arguments)]
    pub fn add_candidate(
        &mut self,
        elections: &mut ElectionRegistry,
        access: &AccessControl,
        registration: CandidateRegistration,
        caller: &Identity,
        election_id: ElectionId,
        name: String,
        description: String,
    ) -> Result<CandidateId, LedgerError> {
        let election = elections.get_mut(election_id)?;

        if registration == CandidateRegistration::CreatorOnly
            && &election.creator != caller
            && !access.is_administrator(caller)
        {
            return Err(LedgerError::Unauthorized {
                caller: caller.clone(),
                action: "add candidates to this election",
            });
        }
        if name.trim().is_empty() {
            return Err(LedgerError::EmptyField("candidate name"));
        }

        let slate = self.slates.entry(election_id).or_insert_with(Slate::new);
        let id = CandidateId::new(slate.ids.allocate());
        tracing::info!(election = %election_id, candidate = %id, name = %name, "candidate added");
        slate.candidates.push(Candidate {
            id,
            name,
            description,
            vote_count: 0,
        });
        election.candidate_ids.push(id);
        Ok(id)
    }

    /// Candidates of an election in registration order.
    pub fn list(
        &self,
        elections: &ElectionRegistry,
        election_id: ElectionId,
    ) -> Result<&[Candidate], LedgerError> {
        elections.get(election_id)?;
        Ok(self.candidates_of(election_id))
    }

    /// Registration-ordered candidates without an existence check; empty for
    /// elections with no candidates (or unknown ones).
    pub(crate) fn candidates_of(&self, election_id: ElectionId) -> &[Candidate] {
        self.slates
            .get(&election_id)
            .map(|s| s.candidates.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, election_id: ElectionId, candidate_id: CandidateId) -> Option<&Candidate> {
        // Ids are allocated from 0 without gaps, so the id is the index.
        let index = usize::try_from(candidate_id.as_u64()).ok()?;
        self.candidates_of(election_id)
            .get(index)
            .filter(|c| c.id == candidate_id)
    }

    pub fn contains(&self, election_id: ElectionId, candidate_id: CandidateId) -> bool {
        self.get(election_id, candidate_id).is_some()
    }

    pub(crate) fn get_mut(
        &mut self,
        election_id: ElectionId,
        candidate_id: CandidateId,
    ) -> Option<&mut Candidate> {
        let index = usize::try_from(candidate_id.as_u64()).ok()?;
        self.slates
            .get_mut(&election_id)?
            .candidates
            .get_mut(index)
            .filter(|c| c.id == candidate_id)
    }

    /// Every non-empty list, keyed by election.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (ElectionId, &[Candidate])> {
        self.slates
            .iter()
            .map(|(id, slate)| (*id, slate.candidates.as_slice()))
    }
}
