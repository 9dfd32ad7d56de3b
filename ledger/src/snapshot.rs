//! Ledger snapshots: the complete state at a point in time.
//!
//! A snapshot is what the daemon keeps on disk between invocations. Restoring
//! one re-checks every invariant the ledger maintains on its own: election
//! fields and windows, id sequences, and tallies against vote records. A
//! hand-edited or truncated file is rejected rather than loaded.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use ballot_types::{CandidateId, ElectionId, Identity};

use crate::access::AccessControl;
use crate::candidate::{Candidate, CandidateRegistry};
use crate::election::{Election, ElectionRegistry};
use crate::error::LedgerError;
use crate::ledger::LedgerState;
use crate::vote::{VoteLedger, VoteRecord};

/// Bumped whenever the serialized layout changes.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub administrator: Identity,
    /// Sorted.
    pub authorized_creators: Vec<Identity>,
    pub next_election_id: u64,
    /// Sorted by id.
    pub elections: Vec<Election>,
    /// Sorted by election id; elections without candidates are omitted.
    pub candidates: Vec<CandidateList>,
    /// Sorted by election id, then voter.
    pub votes: Vec<VoteRecord>,
}

/// The candidates of one election in registration order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateList {
    pub election_id: ElectionId,
    pub candidates: Vec<Candidate>,
}

impl LedgerSnapshot {
    pub(crate) fn capture(state: &LedgerState) -> Self {
        let mut candidates: Vec<CandidateList> = state
            .candidates
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(election_id, list)| CandidateList {
                election_id,
                candidates: list.to_vec(),
            })
            .collect();
        candidates.sort_by_key(|list| list.election_id);

        let mut votes: Vec<VoteRecord> = state.votes.iter().cloned().collect();
        votes.sort_by(|a, b| {
            a.election_id
                .cmp(&b.election_id)
                .then_with(|| a.voter.cmp(&b.voter))
        });

        Self {
            version: SNAPSHOT_VERSION,
            administrator: state.access.administrator().clone(),
            authorized_creators: state.access.creators(),
            next_election_id: state.elections.next_id(),
            elections: state.elections.iter().cloned().collect(),
            candidates,
            votes,
        }
    }

    /// Serialize the snapshot to bytes (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Snapshot(e.to_string()))
    }

    /// Deserialize a snapshot from bytes. Does not validate; see
    /// [`Ledger::restore`](crate::Ledger::restore).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        bincode::deserialize(bytes).map_err(|e| LedgerError::Snapshot(e.to_string()))
    }

    pub fn election_count(&self) -> usize {
        self.elections.len()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Validate and rebuild the in-memory state.
    pub(crate) fn into_state(self) -> Result<LedgerState, LedgerError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(corrupt(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        if !self.administrator.is_valid() {
            return Err(corrupt("administrator identity is empty"));
        }
        if let Some(bad) = self.authorized_creators.iter().find(|c| !c.is_valid()) {
            return Err(corrupt(format!("invalid creator identity {bad:?}")));
        }

        check_election_ids(&self.elections, self.next_election_id)?;
        check_election_fields(&self.elections)?;
        let lists = check_candidates(&self.elections, &self.candidates)?;
        check_votes(&self.elections, &lists, &self.votes)?;

        Ok(LedgerState {
            access: AccessControl::from_parts(self.administrator, self.authorized_creators),
            elections: ElectionRegistry::from_parts(self.elections, self.next_election_id),
            candidates: CandidateRegistry::from_parts(
                self.candidates
                    .into_iter()
                    .map(|list| (list.election_id, list.candidates))
                    .collect(),
            ),
            votes: VoteLedger::from_records(self.votes),
        })
    }
}

fn corrupt(reason: impl Into<String>) -> LedgerError {
    LedgerError::Snapshot(reason.into())
}

/// Ids must run 1, 2, ... with no gaps, and the sequence must continue after
/// the last one.
fn check_election_ids(elections: &[Election], next_id: u64) -> Result<(), LedgerError> {
    for (index, election) in elections.iter().enumerate() {
        let expected = index as u64 + 1;
        if election.id.as_u64() != expected {
            return Err(corrupt(format!(
                "election id {} out of sequence (expected {expected})",
                election.id.as_u64()
            )));
        }
    }
    let expected_next = elections.len() as u64 + 1;
    if next_id != expected_next {
        return Err(corrupt(format!(
            "next election id {next_id} does not follow the last election (expected {expected_next})"
        )));
    }
    Ok(())
}

/// The same rules `ElectionRegistry::create` enforces on new elections.
fn check_election_fields(elections: &[Election]) -> Result<(), LedgerError> {
    for election in elections {
        let id = election.id;
        if election.title.trim().is_empty() {
            return Err(corrupt(format!("election {id} has an empty title")));
        }
        if election.description.trim().is_empty() {
            return Err(corrupt(format!("election {id} has an empty description")));
        }
        if !election.creator.is_valid() {
            return Err(corrupt(format!("election {id} has an empty creator")));
        }
        if election.start_time <= election.created_at {
            return Err(corrupt(format!(
                "election {id} starts at {} but was created at {}",
                election.start_time, election.created_at
            )));
        }
        if election.end_time <= election.start_time {
            return Err(corrupt(format!(
                "election {id} ends at {} before it starts at {}",
                election.end_time, election.start_time
            )));
        }
    }
    Ok(())
}

/// Each list must belong to a known election, carry ids 0..n in order, and
/// agree with the election's own `candidate_ids`.
fn check_candidates<'a>(
    elections: &[Election],
    lists: &'a [CandidateList],
) -> Result<HashMap<ElectionId, &'a [Candidate]>, LedgerError> {
    let mut by_election: HashMap<ElectionId, &[Candidate]> = HashMap::new();
    for list in lists {
        if by_election
            .insert(list.election_id, list.candidates.as_slice())
            .is_some()
        {
            return Err(corrupt(format!(
                "duplicate candidate list for election {}",
                list.election_id
            )));
        }
    }

    let known: HashSet<ElectionId> = elections.iter().map(|e| e.id).collect();
    if let Some(orphan) = by_election.keys().find(|id| !known.contains(id)) {
        return Err(corrupt(format!("candidates for unknown election {orphan}")));
    }

    for election in elections {
        let list = by_election.get(&election.id).copied().unwrap_or(&[]);
        if let Some(unnamed) = list.iter().find(|c| c.name.trim().is_empty()) {
            return Err(corrupt(format!(
                "candidate {} in election {} has an empty name",
                unnamed.id, election.id
            )));
        }
        let ids: Vec<CandidateId> = list.iter().map(|c| c.id).collect();
        if ids != election.candidate_ids {
            return Err(corrupt(format!(
                "candidate ids of election {} disagree with its candidate list",
                election.id
            )));
        }
        if let Some((index, _)) = ids
            .iter()
            .enumerate()
            .find(|(index, id)| id.as_u64() != *index as u64)
        {
            return Err(corrupt(format!(
                "candidate ids of election {} are not contiguous at position {index}",
                election.id
            )));
        }
    }
    Ok(by_election)
}

/// Every record must point at a real candidate, appear once per voter, and
/// the stored counters must equal what the records add up to.
fn check_votes(
    elections: &[Election],
    lists: &HashMap<ElectionId, &[Candidate]>,
    votes: &[VoteRecord],
) -> Result<(), LedgerError> {
    let mut seen: HashSet<(ElectionId, &Identity)> = HashSet::new();
    let mut tally: BTreeMap<(ElectionId, CandidateId), u64> = BTreeMap::new();

    for record in votes {
        let list = lists.get(&record.election_id).copied().unwrap_or(&[]);
        if !list.iter().any(|c| c.id == record.candidate_id) {
            return Err(corrupt(format!(
                "vote by {} references missing candidate {} in election {}",
                record.voter, record.candidate_id, record.election_id
            )));
        }
        if !seen.insert((record.election_id, &record.voter)) {
            return Err(corrupt(format!(
                "{} has more than one vote in election {}",
                record.voter, record.election_id
            )));
        }
        *tally
            .entry((record.election_id, record.candidate_id))
            .or_default() += 1;
    }

    for election in elections {
        let list = lists.get(&election.id).copied().unwrap_or(&[]);
        let mut sum: u64 = 0;
        for candidate in list {
            let recorded = tally
                .get(&(election.id, candidate.id))
                .copied()
                .unwrap_or(0);
            if candidate.vote_count != recorded {
                return Err(corrupt(format!(
                    "candidate {} in election {} claims {} votes but has {recorded} records",
                    candidate.id, election.id, candidate.vote_count
                )));
            }
            sum += recorded;
        }
        if election.total_votes != sum {
            return Err(corrupt(format!(
                "election {} total {} does not match its candidates' sum {sum}",
                election.id, election.total_votes
            )));
        }
    }
    Ok(())
}
