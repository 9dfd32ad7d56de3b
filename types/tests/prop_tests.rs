use proptest::prelude::*;

use ballot_types::{CandidateId, ElectionId, Identity, Timestamp};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp elapsed_since: elapsed_since(now) = now - self (saturating).
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        let now = Timestamp::new(base + offset);
        prop_assert_eq!(t.elapsed_since(now), offset);
        prop_assert_eq!(now.remaining_from(t), offset);
    }

    /// Timestamp plus never wraps around.
    #[test]
    fn timestamp_plus_saturates(base in 0u64..u64::MAX, secs in 0u64..u64::MAX) {
        let shifted = Timestamp::new(base).plus(secs);
        prop_assert!(shifted >= Timestamp::new(base));
    }

    /// ElectionId validity: only 0 is reserved.
    #[test]
    fn election_id_validity(raw in 0u64..u64::MAX) {
        prop_assert_eq!(ElectionId::new(raw).is_valid(), raw != 0);
    }

    /// Ids order like their raw values.
    #[test]
    fn candidate_id_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(CandidateId::new(a) < CandidateId::new(b), a < b);
    }

    /// Identity bincode serialization preserves the raw string.
    #[test]
    fn identity_bincode_roundtrip(raw in "0x[0-9a-f]{40}") {
        let id = Identity::new(raw.clone());
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: Identity = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded.as_str(), raw.as_str());
    }
}
