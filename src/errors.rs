//! errors
//!
//! Crate-level error type for lock operations.
//!
//! # Design
//!
//! Almost nothing in this crate is an error. Contention, lost release races,
//! and malformed lock records all resolve to booleans or silent no-ops; the
//! only failure a caller has to handle is the acquisition timeout, plus
//! whatever the underlying store surfaces (connectivity, protocol errors).
//!
//! # Example
//!
//! ```
//! use relock::LockError;
//!
//! let err = LockError::NotAcquired { key: "user-1".to_string() };
//! assert!(err.to_string().contains("user-1"));
//! ```

use thiserror::Error;

use crate::store::StoreError;

/// Errors from lock operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// The acquisition timeout elapsed without obtaining the lock.
    ///
    /// Recoverable: the caller may retry with a fresh timeout.
    #[error("lock not acquired: {key}")]
    NotAcquired {
        /// The logical resource name that could not be locked.
        key: String,
    },

    /// The underlying key-value store failed.
    ///
    /// Transport and protocol failures propagate unchanged; the lock layer
    /// retries contention, never connectivity.
    #[error(transparent)]
    Store(#[from] StoreError),
}
