//! Election records and their registry.

use crate::access::AccessControl;
use crate::error::LedgerError;
use crate::sequence::IdSequence;
use ballot_types::{CandidateId, ElectionId, Identity, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An election as stored by the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub id: ElectionId,
    pub title: String,
    pub description: String,
    /// First second in which votes are accepted.
    pub start_time: Timestamp,
    /// Last second in which votes are accepted.
    pub end_time: Timestamp,
    /// Administrative switch, independent of the time window.
    pub active: bool,
    pub creator: Identity,
    pub created_at: Timestamp,
    /// Written only by the vote ledger.
    pub total_votes: u64,
    /// Append-only, in registration order.
    pub candidate_ids: Vec<CandidateId>,
}

impl Election {
    /// Active and `start_time <= now <= end_time`.
    pub fn is_votable_at(&self, now: Timestamp) -> bool {
        self.active && self.start_time <= now && now <= self.end_time
    }

    pub fn status_at(&self, now: Timestamp) -> ElectionStatus {
        if !self.active {
            ElectionStatus::Inactive
        } else if now < self.start_time {
            ElectionStatus::Upcoming
        } else if now > self.end_time {
            ElectionStatus::Ended
        } else {
            ElectionStatus::Open
        }
    }
}

/// Where an election stands relative to the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    /// Deactivated by the administrator, whatever the time.
    Inactive,
    Upcoming,
    Open,
    Ended,
}

impl ElectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionStatus::Inactive => "inactive",
            ElectionStatus::Upcoming => "upcoming",
            ElectionStatus::Open => "open",
            ElectionStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller-supplied part of a new election.
#[derive(Clone, Debug)]
pub struct ElectionDraft {
    pub title: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

pub struct ElectionRegistry {
    elections: BTreeMap<ElectionId, Election>,
    ids: IdSequence,
}

impl ElectionRegistry {
    pub fn new() -> Self {
        Self {
            elections: BTreeMap::new(),
            ids: IdSequence::starting_at(1),
        }
    }

    pub(crate) fn from_parts(elections: Vec<Election>, next_id: u64) -> Self {
        Self {
            elections: elections.into_iter().map(|e| (e.id, e)).collect(),
            ids: IdSequence::starting_at(next_id),
        }
    }

    /// Create an election on behalf of `caller`.
    ///
    /// Checks, in order: creation rights, the time window against `now`, and
    /// non-empty text fields. Nothing is allocated unless all pass.
    pub fn create(
        &mut self,
        access: &AccessControl,
        caller: &Identity,
        draft: ElectionDraft,
        now: Timestamp,
    ) -> Result<ElectionId, LedgerError> {
        access.require_creator(caller, "create elections")?;

        if draft.start_time <= now || draft.end_time <= draft.start_time {
            return Err(LedgerError::InvalidTimeWindow {
                start: draft.start_time,
                end: draft.end_time,
                now,
            });
        }
        if draft.title.trim().is_empty() {
            return Err(LedgerError::EmptyField("title"));
        }
        if draft.description.trim().is_empty() {
            return Err(LedgerError::EmptyField("description"));
        }

        let id = ElectionId::new(self.ids.allocate());
        let election = Election {
            id,
            title: draft.title,
            description: draft.description,
            start_time: draft.start_time,
            end_time: draft.end_time,
            active: true,
            creator: caller.clone(),
            created_at: now,
            total_votes: 0,
            candidate_ids: Vec::new(),
        };
        tracing::info!(
            election = %id,
            creator = %caller,
            start = election.start_time.as_secs(),
            end = election.end_time.as_secs(),
            "election created"
        );
        self.elections.insert(id, election);
        Ok(id)
    }

    /// Flip the administrative switch. Returns the new value of `active`.
    pub fn toggle_active(
        &mut self,
        access: &AccessControl,
        caller: &Identity,
        id: ElectionId,
    ) -> Result<bool, LedgerError> {
        access.require_administrator(caller, "toggle election status")?;
        let election = self.get_mut(id)?;
        election.active = !election.active;
        tracing::info!(election = %id, active = election.active, "election status toggled");
        Ok(election.active)
    }

    pub fn get(&self, id: ElectionId) -> Result<&Election, LedgerError> {
        self.elections.get(&id).ok_or(LedgerError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: ElectionId) -> Result<&mut Election, LedgerError> {
        self.elections.get_mut(&id).ok_or(LedgerError::NotFound(id))
    }

    /// Unknown ids are an error, not `false`.
    pub fn is_votable(&self, id: ElectionId, now: Timestamp) -> Result<bool, LedgerError> {
        Ok(self.get(id)?.is_votable_at(now))
    }

    pub fn status(&self, id: ElectionId, now: Timestamp) -> Result<ElectionStatus, LedgerError> {
        Ok(self.get(id)?.status_at(now))
    }

    /// Number of elections created so far.
    pub fn count(&self) -> u64 {
        self.elections.len() as u64
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.ids.peek()
    }

    /// All elections in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Election> {
        self.elections.values()
    }
}

impl Default for ElectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_000_000;

    fn ident(name: &str) -> Identity {
        Identity::new(format!("0x{name}"))
    }

    fn draft(title: &str, start: u64, end: u64) -> ElectionDraft {
        ElectionDraft {
            title: title.to_string(),
            description: "A test election".to_string(),
            start_time: Timestamp::new(start),
            end_time: Timestamp::new(end),
        }
    }

    fn setup() -> (AccessControl, ElectionRegistry) {
        (AccessControl::new(ident("admin")), ElectionRegistry::new())
    }

    #[test]
    fn create_assigns_sequential_ids_from_one() {
        let (access, mut registry) = setup();
        let now = Timestamp::new(NOW);
        assert_eq!(registry.count(), 0);

        let first = registry
            .create(&access, &ident("admin"), draft("First", NOW + 10, NOW + 20), now)
            .unwrap();
        let second = registry
            .create(&access, &ident("admin"), draft("Second", NOW + 10, NOW + 20), now)
            .unwrap();

        assert_eq!(first, ElectionId::new(1));
        assert_eq!(second, ElectionId::new(2));
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn created_election_defaults() {
        let (access, mut registry) = setup();
        let id = registry
            .create(
                &access,
                &ident("admin"),
                draft("Test Election", NOW + 3600, NOW + 10800),
                Timestamp::new(NOW),
            )
            .unwrap();

        let election = registry.get(id).unwrap();
        assert_eq!(election.title, "Test Election");
        assert_eq!(election.description, "A test election");
        assert!(election.active);
        assert_eq!(election.total_votes, 0);
        assert!(election.candidate_ids.is_empty());
        assert_eq!(election.creator, ident("admin"));
        assert_eq!(election.created_at, Timestamp::new(NOW));
    }

    #[test]
    fn unauthorized_caller_cannot_create() {
        let (access, mut registry) = setup();
        let result = registry.create(
            &access,
            &ident("mallory"),
            draft("Nope", NOW + 10, NOW + 20),
            Timestamp::new(NOW),
        );
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn start_must_be_strictly_in_the_future() {
        let (access, mut registry) = setup();
        let now = Timestamp::new(NOW);
        for start in [NOW - 3600, NOW] {
            let result = registry.create(&access, &ident("admin"), draft("Past", start, NOW + 7200), now);
            assert!(matches!(result, Err(LedgerError::InvalidTimeWindow { .. })));
        }
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn end_must_follow_start() {
        let (access, mut registry) = setup();
        let now = Timestamp::new(NOW);
        for end in [NOW + 50, NOW + 100] {
            let result = registry.create(&access, &ident("admin"), draft("Bad", NOW + 100, end), now);
            assert!(matches!(result, Err(LedgerError::InvalidTimeWindow { .. })));
        }
    }

    #[test]
    fn empty_text_fields_rejected_without_consuming_an_id() {
        let (access, mut registry) = setup();
        let now = Timestamp::new(NOW);

        let result = registry.create(&access, &ident("admin"), draft("  ", NOW + 10, NOW + 20), now);
        assert_eq!(result, Err(LedgerError::EmptyField("title")));

        let mut no_description = draft("Title", NOW + 10, NOW + 20);
        no_description.description = String::new();
        let result = registry.create(&access, &ident("admin"), no_description, now);
        assert_eq!(result, Err(LedgerError::EmptyField("description")));

        let id = registry
            .create(&access, &ident("admin"), draft("Ok", NOW + 10, NOW + 20), now)
            .unwrap();
        assert_eq!(id, ElectionId::new(1));
    }

    #[test]
    fn only_administrator_toggles() {
        let (mut access, mut registry) = setup();
        access.authorize(&ident("admin"), &ident("alice")).unwrap();
        let id = registry
            .create(&access, &ident("alice"), draft("T", NOW + 10, NOW + 20), Timestamp::new(NOW))
            .unwrap();

        // Even the election's own creator may not toggle it.
        assert!(matches!(
            registry.toggle_active(&access, &ident("alice"), id),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert_eq!(registry.toggle_active(&access, &ident("admin"), id), Ok(false));
        assert_eq!(registry.toggle_active(&access, &ident("admin"), id), Ok(true));
    }

    #[test]
    fn toggle_unknown_election() {
        let (access, mut registry) = setup();
        assert_eq!(
            registry.toggle_active(&access, &ident("admin"), ElectionId::new(9)),
            Err(LedgerError::NotFound(ElectionId::new(9)))
        );
    }

    #[test]
    fn votable_window_is_inclusive() {
        let (mut access, mut registry) = setup();
        access.authorize(&ident("admin"), &ident("alice")).unwrap();
        let id = registry
            .create(&access, &ident("alice"), draft("W", NOW + 10, NOW + 20), Timestamp::new(NOW))
            .unwrap();

        let at = |t: u64| registry.is_votable(id, Timestamp::new(t)).unwrap();
        assert!(!at(NOW + 9));
        assert!(at(NOW + 10));
        assert!(at(NOW + 15));
        assert!(at(NOW + 20));
        assert!(!at(NOW + 21));
    }

    #[test]
    fn status_follows_clock_and_switch() {
        let (access, mut registry) = setup();
        let admin = ident("admin");
        let id = registry
            .create(&access, &admin, draft("S", NOW + 10, NOW + 20), Timestamp::new(NOW))
            .unwrap();

        assert_eq!(registry.status(id, Timestamp::new(NOW)), Ok(ElectionStatus::Upcoming));
        assert_eq!(registry.status(id, Timestamp::new(NOW + 10)), Ok(ElectionStatus::Open));
        assert_eq!(registry.status(id, Timestamp::new(NOW + 21)), Ok(ElectionStatus::Ended));

        registry.toggle_active(&access, &admin, id).unwrap();
        assert_eq!(registry.status(id, Timestamp::new(NOW + 15)), Ok(ElectionStatus::Inactive));
        assert_eq!(registry.is_votable(id, Timestamp::new(NOW + 15)), Ok(false));
    }

    #[test]
    fn unknown_election_is_not_found_not_false() {
        let (_, registry) = setup();
        assert_eq!(
            registry.is_votable(ElectionId::new(1), Timestamp::new(NOW)),
            Err(LedgerError::NotFound(ElectionId::new(1)))
        );
        assert!(registry.get(ElectionId::RESERVED).is_err());
    }
}
