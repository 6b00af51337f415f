//! store::redis
//!
//! Redis implementation of the [`Store`] trait.
//!
//! # Design
//!
//! Uses a synchronous [`redis::Connection`]. The mapping is direct:
//!
//! - `set_if_all_absent` → `MSETNX`
//! - `watch` / `unwatch` → `WATCH` / `UNWATCH`
//! - `delete_if_unchanged` → `MULTI` / `DEL` / `DEL` / `EXEC` via an atomic
//!   pipeline; a nil `EXEC` reply (the watched-key-changed abort) surfaces
//!   as `Ok(false)`.
//!
//! Watch state is per-connection, so every `Lock` should own its own
//! `RedisStore` rather than sharing one across threads.
//!
//! # Example
//!
//! ```ignore
//! use relock::store::RedisStore;
//!
//! let store = RedisStore::connect("redis://127.0.0.1/")?;
//! let mut lock = relock::Lock::new(store, "user-1");
//! ```

use redis::IntoConnectionInfo;

use super::traits::{Store, StoreError};

/// Store backed by a live Redis connection.
pub struct RedisStore {
    conn: redis::Connection,
}

impl RedisStore {
    /// Connect to Redis and wrap the connection.
    ///
    /// `params` is anything `redis::Client::open` accepts, typically a URL
    /// like `redis://127.0.0.1/`.
    pub fn connect(params: impl IntoConnectionInfo) -> Result<Self, StoreError> {
        let client = redis::Client::open(params).map_err(map_err)?;
        let conn = client.get_connection().map_err(map_err)?;
        Ok(Self { conn })
    }

    /// Wrap an already-established connection.
    pub fn from_connection(conn: redis::Connection) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

fn map_err(e: redis::RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

impl Store for RedisStore {
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        redis::cmd("GET")
            .arg(key)
            .query(&mut self.conn)
            .map_err(map_err)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query::<()>(&mut self.conn)
            .map_err(map_err)
    }

    fn set_if_all_absent(&mut self, entries: &[(&str, &str)]) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("MSETNX");
        for (key, value) in entries {
            cmd.arg(key).arg(value);
        }
        let set: i64 = cmd.query(&mut self.conn).map_err(map_err)?;
        Ok(set == 1)
    }

    fn watch(&mut self, keys: &[&str]) -> Result<(), StoreError> {
        redis::cmd("WATCH")
            .arg(keys)
            .query::<()>(&mut self.conn)
            .map_err(map_err)
    }

    fn unwatch(&mut self) -> Result<(), StoreError> {
        redis::cmd("UNWATCH")
            .query::<()>(&mut self.conn)
            .map_err(map_err)
    }

    fn delete_if_unchanged(&mut self, keys: &[&str]) -> Result<bool, StoreError> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in keys {
            pipe.del(*key);
        }
        // EXEC replies nil when a watched key changed; redis maps that to None.
        let committed: Option<Vec<i64>> = pipe.query(&mut self.conn).map_err(map_err)?;
        Ok(committed.is_some())
    }
}
