//! lock
//!
//! The lock state machine: acquisition, release, life extension, and
//! stale-lock reclaim.
//!
//! # Design
//!
//! A logical lock is two store entries mutated as a pair:
//!
//! - `lock:owner:<key>` — an opaque owner identity string
//! - `lock:expire:<key>` — an absolute Unix timestamp (seconds) as a string
//!
//! Acquisition is a single atomic set-if-both-absent; that operation is the
//! only linearization point for taking the lock. Release and stale-lock
//! reclaim go through watch + transactional delete, so a delete commits only
//! if the pair was unchanged since it was inspected. Expiration is lazy:
//! nothing sweeps stale records in the background, they are reclaimed by
//! whoever next contends for the same key.
//!
//! The in-process [`Lock`] value is not authoritative. Its `locked` flag
//! records what this process believes; the store's key pair decides who
//! actually holds the resource.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use relock::{Lock, LockOptions, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let mut lock = Lock::with_options(
//!     store,
//!     "user-1",
//!     LockOptions {
//!         owner: Some("worker-3".to_string()),
//!         ..LockOptions::default()
//!     },
//! );
//!
//! let renamed = lock.lock_with(Duration::from_secs(1), || {
//!     // exclusive access to user-1
//!     true
//! })?;
//! assert!(renamed);
//! assert!(!lock.is_held());
//! # Ok::<(), relock::LockError>(())
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::backoff;
use crate::errors::LockError;
use crate::store::Store;

/// Default hold duration (1 minute).
pub const DEFAULT_LIFE: Duration = Duration::from_secs(60);

/// Default acquisition timeout (10 seconds).
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Namespace prefix for owner keys.
const OWNER_PREFIX: &str = "lock:owner:";

/// Namespace prefix for expiration keys.
const EXPIRE_PREFIX: &str = "lock:expire:";

/// Construction options for a [`Lock`].
#[derive(Debug, Clone)]
pub struct LockOptions {
    /// How long the lock is expected to be held once acquired.
    pub life: Duration,
    /// Owner identity string; defaults to [`default_owner`] (`<hostname>:<pid>`).
    pub owner: Option<String>,
    /// Initial backoff interval between acquisition attempts.
    pub sleep: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            life: DEFAULT_LIFE,
            owner: None,
            sleep: backoff::DEFAULT_INITIAL_INTERVAL,
        }
    }
}

/// The default owner identity: `<hostname>:<pid>`.
///
/// Used purely for comparison (do-I-own-this-lock), never parsed.
pub fn default_owner() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string());
    format!("{}:{}", host, std::process::id())
}

/// Current Unix time in whole seconds.
fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// True iff a lock record exists in some form and its expiration has passed.
///
/// A malformed record, such as an owner with no parseable expiration,
/// counts as expired: it is broken and reclaimable. Absence of both fields
/// is never expired; there is nothing to expire. The boundary is strict:
/// `expire == now` is not yet expired.
pub fn is_expired(owner: Option<&str>, expire: Option<&str>, now: i64) -> bool {
    let stamp = expire
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);
    (owner.is_some() || stamp > 0) && stamp < now
}

/// True iff a record exists (either field present) and is expired.
///
/// A record that never existed is not deleteable; a live record is not
/// deleteable. Only stale or broken records qualify.
pub fn is_deleteable(owner: Option<&str>, expire: Option<&str>, now: i64) -> bool {
    (owner.is_some() || expire.is_some()) && is_expired(owner, expire, now)
}

/// A lock over one logical key in a shared store.
///
/// Each `Lock` owns its store handle; concurrency exists only across
/// independent `Lock` instances contending on the same keys. Nothing here
/// spawns threads or tasks; the only blocking is the backoff sleep during
/// acquisition.
#[derive(Debug)]
pub struct Lock<S: Store> {
    store: S,
    key: String,
    owner_key: String,
    owner_value: String,
    expire_key: String,
    expire_value: i64,
    life: Duration,
    sleep: Duration,
    locked: bool,
}

impl<S: Store> Lock<S> {
    /// Create a lock on `key` with default options.
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self::with_options(store, key, LockOptions::default())
    }

    /// Create a lock on `key` with explicit options.
    pub fn with_options(store: S, key: impl Into<String>, options: LockOptions) -> Self {
        let key = key.into();
        Self {
            owner_key: format!("{OWNER_PREFIX}{key}"),
            expire_key: format!("{EXPIRE_PREFIX}{key}"),
            owner_value: options.owner.unwrap_or_else(default_owner),
            expire_value: 0,
            life: options.life,
            sleep: options.sleep,
            locked: false,
            store,
            key,
        }
    }

    /// The logical resource name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// This lock's owner identity string.
    pub fn owner(&self) -> &str {
        &self.owner_value
    }

    /// The store key holding the owner field.
    pub fn owner_key(&self) -> &str {
        &self.owner_key
    }

    /// The store key holding the expiration field.
    pub fn expire_key(&self) -> &str {
        &self.expire_key
    }

    /// Whether this instance believes it holds the lock.
    ///
    /// Local belief only; the store's key pair is authoritative, and this
    /// flag does not notice external expiration.
    pub fn is_held(&self) -> bool {
        self.locked
    }

    /// The expiration stamp recorded at the last successful acquire or
    /// extension, if any.
    pub fn expires_at(&self) -> Option<i64> {
        self.locked.then_some(self.expire_value)
    }

    /// Acquire the lock, retrying with exponential backoff until `timeout`.
    ///
    /// # Errors
    ///
    /// [`LockError::NotAcquired`] if the timeout elapses; store errors
    /// propagate unchanged.
    pub fn acquire(&mut self, timeout: Duration) -> Result<(), LockError> {
        self.locked = false;
        let sleep = self.sleep;
        let acquired = backoff::retry_until(timeout, sleep, || self.try_acquire_once())?;
        if acquired {
            Ok(())
        } else {
            debug!(key = %self.key, owner = %self.owner_value, "lock acquisition timed out");
            Err(LockError::NotAcquired {
                key: self.key.clone(),
            })
        }
    }

    /// Acquire, run `body`, and release on every exit path.
    ///
    /// The lock never outlives the body: release happens on normal return
    /// and, best-effort, if the body panics. Returns the body's value.
    pub fn lock_with<T>(
        &mut self,
        timeout: Duration,
        body: impl FnOnce() -> T,
    ) -> Result<T, LockError> {
        self.acquire(timeout)?;
        let mut guard = ReleaseGuard {
            lock: self,
            released: false,
        };
        let value = body();
        guard.release()?;
        Ok(value)
    }

    /// Release the lock if we still own it.
    ///
    /// Idempotent: releasing twice, releasing a lock we never acquired, or
    /// losing a release race to a reclaimer are all silent no-ops. The
    /// local `locked` flag is cleared unconditionally.
    pub fn unlock(&mut self) -> Result<(), LockError> {
        let me = self.owner_value.clone();
        self.release_as(&me)
    }

    /// Extend the hold by rewriting the expiration stamp to `now + new_life`.
    ///
    /// Only meaningful on a held lock; calling it otherwise is a no-op.
    /// The write is unconditional: only the legitimate holder is expected
    /// to call this, and a lost race just widens the staleness window the
    /// design already tolerates.
    pub fn extend_life(&mut self, new_life: Duration) -> Result<(), LockError> {
        if !self.locked {
            warn!(key = %self.key, "extend_life on a lock not held; ignoring");
            return Ok(());
        }
        let stamp = unix_now() + new_life.as_secs() as i64;
        self.store.set(&self.expire_key, &stamp.to_string())?;
        self.expire_value = stamp;
        self.life = new_life;
        debug!(key = %self.key, expires_at = stamp, "lock life extended");
        Ok(())
    }

    /// True iff `owner` is this lock's own identity and the record is not
    /// expired. Pure over its inputs; no store I/O.
    pub fn is_locked(&self, owner: Option<&str>, expire: Option<&str>, now: i64) -> bool {
        owner == Some(self.owner_value.as_str()) && !is_expired(owner, expire, now)
    }

    /// One acquisition attempt: atomic set of both fields if both absent.
    ///
    /// On conflict, gives the stale-lock reclaimer one chance before
    /// reporting failure to the backoff driver. No internal retry loop;
    /// yielding to the driver keeps attempt cost bounded and never starves
    /// the backoff sleep.
    fn try_acquire_once(&mut self) -> Result<bool, LockError> {
        let now = unix_now();
        let candidate = now + self.life.as_secs() as i64;
        let candidate_str = candidate.to_string();
        let entries = [
            (self.owner_key.as_str(), self.owner_value.as_str()),
            (self.expire_key.as_str(), candidate_str.as_str()),
        ];
        if self.store.set_if_all_absent(&entries)? {
            self.expire_value = candidate;
            self.locked = true;
            debug!(key = %self.key, owner = %self.owner_value, expires_at = candidate, "lock acquired");
            Ok(true)
        } else {
            debug!(key = %self.key, "lock held elsewhere; checking for a stale record");
            self.reclaim_if_stale(now)?;
            Ok(false)
        }
    }

    /// Delete the key pair if it represents an expired or broken lock.
    ///
    /// Returns `true` iff both deletions committed in one unchanged-snapshot
    /// transaction. Safe to race from many processes: at most one caller's
    /// transaction commits per stale record.
    fn reclaim_if_stale(&mut self, now: i64) -> Result<bool, LockError> {
        self.store.watch(&[self.owner_key.as_str(), self.expire_key.as_str()])?;
        let outcome = self.reclaim_under_watch(now);
        // Unwatch on every exit path, error or not.
        let unwatched = self.store.unwatch();
        let reclaimed = outcome?;
        unwatched?;
        Ok(reclaimed)
    }

    fn reclaim_under_watch(&mut self, now: i64) -> Result<bool, LockError> {
        let owner = self.store.get(&self.owner_key)?;
        let expire = self.store.get(&self.expire_key)?;
        if !is_deleteable(owner.as_deref(), expire.as_deref(), now) {
            return Ok(false);
        }
        let deleted = self
            .store
            .delete_if_unchanged(&[self.owner_key.as_str(), self.expire_key.as_str()])?;
        if deleted {
            debug!(key = %self.key, stale_owner = ?owner, "reclaimed stale lock record");
        } else {
            debug!(key = %self.key, "stale reclaim lost the race; leaving record alone");
        }
        Ok(deleted)
    }

    /// Delete the key pair iff the owner field still equals `expected_owner`.
    ///
    /// The owner parameter exists so tests can exercise foreign-owner
    /// releases; `unlock` passes our own identity.
    fn release_as(&mut self, expected_owner: &str) -> Result<(), LockError> {
        self.store.watch(&[self.owner_key.as_str(), self.expire_key.as_str()])?;
        let outcome = self.release_under_watch(expected_owner);
        let unwatched = self.store.unwatch();
        // No matter what happened, this process no longer holds the lock.
        self.locked = false;
        outcome?;
        unwatched?;
        Ok(())
    }

    fn release_under_watch(&mut self, expected_owner: &str) -> Result<(), LockError> {
        let owner = self.store.get(&self.owner_key)?;
        if owner.as_deref() != Some(expected_owner) {
            // We never owned it, or we already lost it.
            return Ok(());
        }
        let deleted = self
            .store
            .delete_if_unchanged(&[self.owner_key.as_str(), self.expire_key.as_str()])?;
        if !deleted {
            // A reclaimer or re-acquirer raced us. The effect the caller
            // wants (we do not hold the lock) is already true.
            debug!(key = %self.key, "release transaction aborted; lock changed hands");
        }
        Ok(())
    }
}

/// Releases the lock when dropped, unless an explicit release already ran.
struct ReleaseGuard<'a, S: Store> {
    lock: &'a mut Lock<S>,
    released: bool,
}

impl<S: Store> ReleaseGuard<'_, S> {
    fn release(&mut self) -> Result<(), LockError> {
        self.released = true;
        self.lock.unlock()
    }
}

impl<S: Store> Drop for ReleaseGuard<'_, S> {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.lock.unlock();
        }
    }
}
