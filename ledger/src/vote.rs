//! Vote records: one per (election, voter), forever.
//!
//! The vote ledger is the only writer of `Candidate::vote_count` and
//! `Election::total_votes`. A vote is validated completely before anything is
//! written, so a rejected vote leaves every counter untouched.

use crate::candidate::CandidateRegistry;
use crate::election::ElectionRegistry;
use crate::error::LedgerError;
use ballot_types::{CandidateId, ElectionId, Identity, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub election_id: ElectionId,
    pub voter: Identity,
    pub candidate_id: CandidateId,
    pub cast_at: Timestamp,
}

#[derive(Default)]
pub struct VoteLedger {
    records: HashMap<ElectionId, HashMap<Identity, VoteRecord>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: Vec<VoteRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger
                .records
                .entry(record.election_id)
                .or_default()
                .insert(record.voter.clone(), record);
        }
        ledger
    }

    /// Record `caller`'s vote.
    ///
    /// Checks, in order: the election exists, the candidate belongs to it,
    /// the election is votable at `now`, and `caller` has not voted in it.
    /// Then writes the record and both counters.
    pub fn cast_vote(
        &mut self,
        elections: &mut ElectionRegistry,
        candidates: &mut CandidateRegistry,
        caller: &Identity,
        election_id: ElectionId,
        candidate_id: CandidateId,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let election = elections.get_mut(election_id)?;
        let candidate = candidates.get_mut(election_id, candidate_id).ok_or(
            LedgerError::CandidateNotFound {
                election: election_id,
                candidate: candidate_id,
            },
        )?;
        if !election.is_votable_at(now) {
            return Err(LedgerError::NotVotable(election_id));
        }
        let ballots = self.records.entry(election_id).or_default();
        if ballots.contains_key(caller) {
            return Err(LedgerError::AlreadyVoted {
                election: election_id,
                voter: caller.clone(),
            });
        }

        ballots.insert(
            caller.clone(),
            VoteRecord {
                election_id,
                voter: caller.clone(),
                candidate_id,
                cast_at: now,
            },
        );
        candidate.vote_count += 1;
        election.total_votes += 1;

        tracing::info!(
            election = %election_id,
            candidate = %candidate_id,
            voter = %caller,
            total = election.total_votes,
            "vote cast"
        );
        Ok(())
    }

    pub fn has_voted(
        &self,
        elections: &ElectionRegistry,
        election_id: ElectionId,
        voter: &Identity,
    ) -> Result<bool, LedgerError> {
        elections.get(election_id)?;
        Ok(self.record(election_id, voter).is_some())
    }

    pub fn choice_of(
        &self,
        elections: &ElectionRegistry,
        election_id: ElectionId,
        voter: &Identity,
    ) -> Result<CandidateId, LedgerError> {
        elections.get(election_id)?;
        self.record(election_id, voter)
            .map(|r| r.candidate_id)
            .ok_or_else(|| LedgerError::NoVote {
                election: election_id,
                voter: voter.clone(),
            })
    }

    fn record(&self, election_id: ElectionId, voter: &Identity) -> Option<&VoteRecord> {
        self.records.get(&election_id)?.get(voter)
    }

    /// Every record, in no particular order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &VoteRecord> {
        self.records.values().flat_map(|ballots| ballots.values())
    }
}
