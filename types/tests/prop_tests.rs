use proptest::prelude::*;

use idgate_types::{LivenessAction, Timestamp, UserId};

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
    }

    /// Timestamp has_expired agrees with manual arithmetic.
    #[test]
    fn timestamp_has_expired_correct(
        start in 0u64..500_000,
        duration in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start.saturating_add(offset));
        prop_assert_eq!(t.has_expired(duration, now), offset >= duration);
    }

    /// Any non-empty id without whitespace is accepted verbatim.
    #[test]
    fn user_id_accepts_compact_tokens(raw in "[A-Za-z0-9_-]{1,64}") {
        let id = UserId::new(raw.clone()).unwrap();
        prop_assert_eq!(id.as_str(), raw.as_str());
    }

    /// Ids containing whitespace are always rejected.
    #[test]
    fn user_id_rejects_whitespace(left in "[a-z]{0,10}", right in "[a-z]{0,10}") {
        let raw = format!("{left} {right}");
        prop_assert!(UserId::new(raw).is_err());
    }

    /// Every liveness action parses back from its display name.
    #[test]
    fn liveness_action_display_parses(idx in 0usize..4) {
        let action = LivenessAction::ALL[idx];
        prop_assert_eq!(action.to_string().parse::<LivenessAction>().unwrap(), action);
    }
}
