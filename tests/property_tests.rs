//! Property-based tests for the lock record predicates.
//!
//! These tests use proptest to verify the predicate laws hold across
//! randomly generated owner/expiration/clock combinations, including
//! malformed records.

use std::time::Duration;

use proptest::prelude::*;

use relock::{is_deleteable, is_expired, Lock, LockOptions, MemoryStore};

/// Strategy for an optional owner field.
fn owner_field() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("me".to_string())),
        "[a-z0-9:._-]{1,20}".prop_map(Some),
    ]
}

/// Strategy for an optional expiration field: absent, a numeric stamp, or
/// unparseable garbage.
fn expire_field() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        (-1000i64..2_000_000_000i64).prop_map(|n| Some(n.to_string())),
        "[a-z ]{1,10}".prop_map(Some),
    ]
}

/// The stamp a field parses to, with garbage and absence both reading as 0.
fn parsed_stamp(expire: Option<&str>) -> i64 {
    expire.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0)
}

proptest! {
    /// is_expired(owner, expire, now) == (owner present || stamp > 0) && stamp < now.
    #[test]
    fn is_expired_matches_its_law(
        owner in owner_field(),
        expire in expire_field(),
        now in 0i64..2_000_000_000i64,
    ) {
        let stamp = parsed_stamp(expire.as_deref());
        let expected = (owner.is_some() || stamp > 0) && stamp < now;
        prop_assert_eq!(
            is_expired(owner.as_deref(), expire.as_deref(), now),
            expected
        );
    }

    /// A record is deleteable iff it exists in any form and is expired.
    #[test]
    fn is_deleteable_matches_its_law(
        owner in owner_field(),
        expire in expire_field(),
        now in 0i64..2_000_000_000i64,
    ) {
        let exists = owner.is_some() || expire.is_some();
        let expected = exists && is_expired(owner.as_deref(), expire.as_deref(), now);
        prop_assert_eq!(
            is_deleteable(owner.as_deref(), expire.as_deref(), now),
            expected
        );
    }

    /// A record that never existed is never expired and never deleteable.
    #[test]
    fn absent_record_is_inert(now in 0i64..2_000_000_000i64) {
        prop_assert!(!is_expired(None, None, now));
        prop_assert!(!is_deleteable(None, None, now));
    }

    /// is_locked == (owner is ours) && !is_expired.
    #[test]
    fn is_locked_matches_its_law(
        owner in owner_field(),
        expire in expire_field(),
        now in 0i64..2_000_000_000i64,
    ) {
        let lock = Lock::with_options(
            MemoryStore::new(),
            "k",
            LockOptions {
                owner: Some("me".to_string()),
                life: Duration::from_secs(60),
                ..LockOptions::default()
            },
        );
        let expected = owner.as_deref() == Some("me")
            && !is_expired(owner.as_deref(), expire.as_deref(), now);
        prop_assert_eq!(
            lock.is_locked(owner.as_deref(), expire.as_deref(), now),
            expected
        );
    }

    /// Key derivation is deterministic and namespaced for any key.
    #[test]
    fn key_pair_derivation(key in "[a-zA-Z0-9._-]{1,30}") {
        let lock = Lock::new(MemoryStore::new(), key.clone());
        let expected_owner_key = format!("lock:owner:{key}");
        let expected_expire_key = format!("lock:expire:{key}");
        prop_assert_eq!(lock.owner_key(), expected_owner_key.as_str());
        prop_assert_eq!(lock.expire_key(), expected_expire_key.as_str());
    }
}
