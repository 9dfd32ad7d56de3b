//! End-to-end scenarios through the public `Ledger` facade:
//! authorization → election → candidates → votes → results → snapshot.

use std::sync::{Arc, Mutex};
use std::thread;

use ballot_ledger::{
    ElectionStatus, Ledger, LedgerError, LedgerEvent, LedgerPolicy, LedgerSnapshot,
};
use ballot_nullables::NullClock;
use ballot_types::{CandidateId, Clock, ElectionId, Identity, Timestamp};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const START_SECS: u64 = 1_700_000_000;

fn ident(name: &str) -> Identity {
    Identity::new(format!("0x{name}"))
}

fn admin() -> Identity {
    ident("admin")
}

fn new_ledger() -> (Arc<NullClock>, Ledger) {
    let clock = Arc::new(NullClock::new(START_SECS));
    let ledger = Ledger::new(admin(), clock.clone()).unwrap();
    (clock, ledger)
}

/// Creates an election opening in a minute and lasting an hour, registers
/// the given candidates, and moves the clock into the voting window.
fn running_election(clock: &NullClock, ledger: &Ledger, names: &[&str]) -> ElectionId {
    let now = clock.now();
    let id = ledger
        .create_election(
            &admin(),
            "Active Election",
            "Currently active election",
            now.plus(60),
            now.plus(3660),
        )
        .unwrap();
    for name in names {
        ledger.add_candidate(&admin(), id, *name, format!("{name} for office")).unwrap();
    }
    clock.advance(120);
    id
}

fn tally(ledger: &Ledger, id: ElectionId) -> (Vec<(String, u64)>, u64) {
    let results = ledger.results(id).unwrap();
    let rows = results
        .candidates
        .into_iter()
        .map(|c| (c.name, c.vote_count))
        .collect();
    (rows, results.total_votes)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn full_election_lifecycle() {
    let (clock, ledger) = new_ledger();
    let id = running_election(&clock, &ledger, &["Alice", "Bob"]);

    ledger.cast_vote(&ident("a"), id, CandidateId::new(0)).unwrap();
    ledger.cast_vote(&ident("b"), id, CandidateId::new(0)).unwrap();
    ledger.cast_vote(&ident("c"), id, CandidateId::new(1)).unwrap();

    let (rows, total) = tally(&ledger, id);
    assert_eq!(rows, vec![("Alice".to_string(), 2), ("Bob".to_string(), 1)]);
    assert_eq!(total, 3);
    assert_eq!(ledger.winner(id).unwrap().name, "Alice");

    let standings = ledger.standings(id).unwrap();
    assert_eq!(standings[0].rank, 1);
    assert_eq!(standings[0].share_bps, 6666);

    clock.advance(3600);
    assert_eq!(ledger.status(id), Ok(ElectionStatus::Ended));
    assert_eq!(ledger.winner(id).unwrap().name, "Alice");
}

#[test]
fn election_count_grows_with_creates() {
    let (clock, ledger) = new_ledger();
    let now = clock.now();
    assert_eq!(ledger.election_count(), 0);

    ledger
        .create_election(&admin(), "First", "First election", now.plus(10), now.plus(20))
        .unwrap();
    assert_eq!(ledger.election_count(), 1);
    ledger
        .create_election(&admin(), "Second", "Second election", now.plus(10), now.plus(20))
        .unwrap();
    assert_eq!(ledger.election_count(), 2);

    let ids: Vec<ElectionId> = ledger.elections().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![ElectionId::new(1), ElectionId::new(2)]);
}

#[test]
fn failed_vote_leaves_state_unchanged() {
    let (clock, ledger) = new_ledger();
    let id = running_election(&clock, &ledger, &["Alice", "Bob"]);
    ledger.cast_vote(&ident("a"), id, CandidateId::new(1)).unwrap();
    let before = ledger.snapshot();

    assert_eq!(
        ledger.cast_vote(&ident("b"), id, CandidateId::new(5)),
        Err(LedgerError::CandidateNotFound {
            election: id,
            candidate: CandidateId::new(5),
        })
    );
    assert!(matches!(
        ledger.cast_vote(&ident("a"), id, CandidateId::new(0)),
        Err(LedgerError::AlreadyVoted { .. })
    ));

    assert_eq!(ledger.snapshot(), before);
    assert_eq!(ledger.has_voted(id, &ident("b")), Ok(false));
    assert_eq!(ledger.choice_of(id, &ident("a")), Ok(CandidateId::new(1)));
}

#[test]
fn creation_window_rules() {
    let (clock, ledger) = new_ledger();
    let now = clock.now();

    for (start, end) in [
        (now, now.plus(100)),
        (Timestamp::new(START_SECS - 60), now.plus(3600)),
        (now.plus(100), now.plus(100)),
        (now.plus(100), now.plus(50)),
    ] {
        assert!(matches!(
            ledger.create_election(&admin(), "Bad", "Bad window", start, end),
            Err(LedgerError::InvalidTimeWindow { .. })
        ));
    }
    assert_eq!(ledger.election_count(), 0);
}

#[test]
fn only_administrator_manages_access_and_status() {
    let (clock, ledger) = new_ledger();
    let id = running_election(&clock, &ledger, &["Alice"]);
    let alice = ident("alice");

    assert!(matches!(
        ledger.authorize_creator(&alice, &ident("bob")),
        Err(LedgerError::Unauthorized { .. })
    ));
    assert!(matches!(
        ledger.revoke_creator(&alice, &ident("bob")),
        Err(LedgerError::Unauthorized { .. })
    ));
    assert!(matches!(
        ledger.toggle_active(&alice, id),
        Err(LedgerError::Unauthorized { .. })
    ));

    assert_eq!(ledger.toggle_active(&admin(), id), Ok(false));
    assert_eq!(ledger.is_votable(id), Ok(false));
    assert!(matches!(
        ledger.cast_vote(&alice, id, CandidateId::new(0)),
        Err(LedgerError::NotVotable(_))
    ));
    assert_eq!(ledger.toggle_active(&admin(), id), Ok(true));
    assert_eq!(ledger.is_votable(id), Ok(true));
}

#[test]
fn authorized_creator_can_create_until_revoked() {
    let (clock, ledger) = new_ledger();
    let creator = ident("creator");
    let now = clock.now();

    assert!(matches!(
        ledger.create_election(&creator, "Early", "Too early", now.plus(10), now.plus(20)),
        Err(LedgerError::Unauthorized { .. })
    ));

    assert_eq!(ledger.authorize_creator(&admin(), &creator), Ok(true));
    assert!(ledger.is_authorized(&creator));
    assert_eq!(ledger.authorized_creators(), vec![creator.clone()]);
    let id = ledger
        .create_election(&creator, "Club", "Club chair", now.plus(10), now.plus(20))
        .unwrap();
    assert_eq!(ledger.election(id).unwrap().creator, creator);

    assert_eq!(ledger.revoke_creator(&admin(), &creator), Ok(true));
    assert!(!ledger.is_authorized(&creator));
    assert!(matches!(
        ledger.create_election(&creator, "Late", "Too late", now.plus(10), now.plus(20)),
        Err(LedgerError::Unauthorized { .. })
    ));
    // The election already created survives revocation.
    assert_eq!(ledger.election_count(), 1);
}

#[test]
fn events_reach_subscribers() {
    let (clock, ledger) = new_ledger();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    ledger.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));

    let id = running_election(&clock, &ledger, &["Alice"]);
    ledger.cast_vote(&ident("v"), id, CandidateId::new(0)).unwrap();

    let events = events.lock().unwrap();
    assert!(matches!(
        &events[0],
        LedgerEvent::ElectionCreated { election_id, creator, .. }
            if *election_id == id && *creator == admin()
    ));
    assert_eq!(
        events.last(),
        Some(&LedgerEvent::VoteCast {
            election_id: id,
            candidate_id: CandidateId::new(0),
            voter: ident("v"),
        })
    );
}

#[test]
fn concurrent_voters_are_each_counted_once() {
    let (clock, ledger) = new_ledger();
    let ledger = Arc::new(ledger);
    let id = running_election(&clock, &ledger, &["Alice", "Bob", "Carol"]);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..50u64 {
                    let voter = ident(&format!("t{t}-v{i}"));
                    ledger.cast_vote(&voter, id, CandidateId::new(i % 3)).unwrap();
                    // Every thread also retries a shared voter; only one wins.
                    let _ = ledger.cast_vote(&ident("shared"), id, CandidateId::new(0));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let results = ledger.results(id).unwrap();
    let sum: u64 = results.candidates.iter().map(|c| c.vote_count).sum();
    assert_eq!(results.total_votes, 8 * 50 + 1);
    assert_eq!(sum, results.total_votes);
    assert_eq!(ledger.has_voted(id, &ident("shared")), Ok(true));
}

#[test]
fn snapshot_roundtrip_through_bytes() {
    let (clock, ledger) = new_ledger();
    ledger.authorize_creator(&admin(), &ident("creator")).unwrap();
    let id = running_election(&clock, &ledger, &["Alice", "Bob"]);
    ledger.cast_vote(&ident("a"), id, CandidateId::new(1)).unwrap();

    let bytes = ledger.snapshot().to_bytes().unwrap();
    let restored = Ledger::restore(
        LedgerSnapshot::from_bytes(&bytes).unwrap(),
        clock.clone(),
        LedgerPolicy::default(),
    )
    .unwrap();

    assert_eq!(restored.snapshot(), ledger.snapshot());
    assert_eq!(restored.administrator(), admin());
    assert!(restored.is_authorized(&ident("creator")));
    assert_eq!(restored.choice_of(id, &ident("a")), Ok(CandidateId::new(1)));
    assert!(matches!(
        restored.cast_vote(&ident("a"), id, CandidateId::new(0)),
        Err(LedgerError::AlreadyVoted { .. })
    ));
    assert_eq!(restored.add_candidate(&admin(), id, "Carol", ""), Ok(CandidateId::new(2)));
}

#[test]
fn tampered_snapshot_is_rejected() {
    let (clock, ledger) = new_ledger();
    let id = running_election(&clock, &ledger, &["Alice", "Bob"]);
    ledger.cast_vote(&ident("a"), id, CandidateId::new(0)).unwrap();

    let mut snapshot = ledger.snapshot();
    snapshot.candidates[0].candidates[1].vote_count = 5;
    assert!(matches!(
        Ledger::restore(snapshot, clock.clone(), LedgerPolicy::default()),
        Err(LedgerError::Snapshot(_))
    ));
}
