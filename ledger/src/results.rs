//! Read-side tallies: results, winner, standings.

use crate::candidate::{Candidate, CandidateRegistry};
use crate::election::ElectionRegistry;
use crate::error::LedgerError;
use ballot_types::ElectionId;
use serde::{Deserialize, Serialize};

/// Candidates in registration order with the election's running total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub candidates: Vec<Candidate>,
    pub total_votes: u64,
}

/// A candidate's place in the ranking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// 1-based; tied candidates get consecutive ranks, lower id first.
    pub rank: u32,
    pub candidate: Candidate,
    /// Share of the election's total votes in basis points (10000 = 100%).
    pub share_bps: u32,
}

/// Queries over the registries. Borrows, never mutates.
pub struct ResultEngine<'a> {
    elections: &'a ElectionRegistry,
    candidates: &'a CandidateRegistry,
}

impl<'a> ResultEngine<'a> {
    pub fn new(elections: &'a ElectionRegistry, candidates: &'a CandidateRegistry) -> Self {
        Self {
            elections,
            candidates,
        }
    }

    pub fn results(&self, election_id: ElectionId) -> Result<ElectionResults, LedgerError> {
        let election = self.elections.get(election_id)?;
        Ok(ElectionResults {
            election_id,
            candidates: self.candidates.candidates_of(election_id).to_vec(),
            total_votes: election.total_votes,
        })
    }

    /// The candidate with the most votes; the lowest id wins a tie.
    pub fn winner(&self, election_id: ElectionId) -> Result<Candidate, LedgerError> {
        self.elections.get(election_id)?;
        let mut leader: Option<&Candidate> = None;
        for candidate in self.candidates.candidates_of(election_id) {
            match leader {
                Some(best) if candidate.vote_count <= best.vote_count => {}
                _ => leader = Some(candidate),
            }
        }
        leader
            .cloned()
            .ok_or(LedgerError::NoCandidates(election_id))
    }

    /// Candidates ordered by votes, most first.
    pub fn standings(&self, election_id: ElectionId) -> Result<Vec<Standing>, LedgerError> {
        let election = self.elections.get(election_id)?;
        let mut ranked = self.candidates.candidates_of(election_id).to_vec();
        // Stable sort keeps registration order among equal counts.
        ranked.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));

        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(i, candidate)| Standing {
                rank: i as u32 + 1,
                share_bps: share_bps(candidate.vote_count, election.total_votes),
                candidate,
            })
            .collect())
    }
}

fn share_bps(votes: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((votes as u128 * 10_000) / total as u128) as u32
}
