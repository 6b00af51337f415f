//! Live Redis tests, disabled by default.
//!
//! Run with a local Redis and the feature enabled:
//!
//! ```text
//! REDIS_URL=redis://127.0.0.1/ cargo test --features live_redis_tests
//! ```
//!
//! These exercise the real WATCH/MULTI/EXEC and MSETNX paths the in-memory
//! store only models.

#![cfg(feature = "live_redis_tests")]

use std::time::Duration;

use relock::{Lock, LockError, LockOptions, RedisStore, Store};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string())
}

fn store() -> RedisStore {
    RedisStore::connect(redis_url()).expect("connect to Redis")
}

fn lock_as(key: &str, owner: &str, life: Duration) -> Lock<RedisStore> {
    Lock::with_options(
        store(),
        key,
        LockOptions {
            life,
            owner: Some(owner.to_string()),
            ..LockOptions::default()
        },
    )
}

fn clear(key: &str) {
    let mut s = store();
    let owner_key = format!("lock:owner:{key}");
    let expire_key = format!("lock:expire:{key}");
    let _ = s.delete_if_unchanged(&[owner_key.as_str(), expire_key.as_str()]);
}

#[test]
fn acquire_and_release_against_redis() {
    let key = "relock-live-basic";
    clear(key);

    let mut lock = lock_as(key, "live-alice", Duration::from_secs(60));
    lock.acquire(Duration::from_secs(1)).unwrap();
    assert!(lock.is_held());

    let mut probe = store();
    assert_eq!(
        probe.get(&format!("lock:owner:{key}")).unwrap(),
        Some("live-alice".to_string())
    );

    lock.unlock().unwrap();
    assert_eq!(probe.get(&format!("lock:owner:{key}")).unwrap(), None);
    assert_eq!(probe.get(&format!("lock:expire:{key}")).unwrap(), None);
}

#[test]
fn contention_against_redis() {
    let key = "relock-live-contention";
    clear(key);

    let mut alice = lock_as(key, "live-alice", Duration::from_secs(60));
    let mut bob = lock_as(key, "live-bob", Duration::from_secs(60));

    alice.acquire(Duration::from_secs(1)).unwrap();
    assert!(matches!(
        bob.acquire(Duration::from_millis(300)),
        Err(LockError::NotAcquired { .. })
    ));

    alice.unlock().unwrap();
    bob.acquire(Duration::from_secs(1)).unwrap();
    bob.unlock().unwrap();
}

#[test]
fn stale_record_reclaimed_against_redis() {
    let key = "relock-live-stale";
    clear(key);

    // Seed a long-expired record by hand.
    let mut seed = store();
    seed.set(&format!("lock:owner:{key}"), "live-ghost").unwrap();
    seed.set(&format!("lock:expire:{key}"), "12345").unwrap();

    let mut bob = lock_as(key, "live-bob", Duration::from_secs(60));
    bob.acquire(Duration::from_secs(2)).unwrap();

    let mut probe = store();
    assert_eq!(
        probe.get(&format!("lock:owner:{key}")).unwrap(),
        Some("live-bob".to_string())
    );
    bob.unlock().unwrap();
}
