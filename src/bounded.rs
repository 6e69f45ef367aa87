//! Timeout-bounded collaborator calls.
//!
//! Calls into external collaborators (cache, registry search, normalization
//! service) can be given an upper bound. A bounded call runs on a named
//! helper thread and the caller waits on a single-slot channel with
//! `recv_timeout`. On timeout the helper is left to finish on its own; its
//! result is discarded.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::error::{ReconcileError, ReconcileResult};

fn duration_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Runs `f`, waiting at most `timeout` for it to finish.
///
/// With no timeout `f` runs inline on the caller's thread.
///
/// # Errors
///
/// - `Timeout` if `f` does not finish in time.
/// - `Disconnected` if the helper thread could not be spawned or died
///   without replying.
pub fn call_with_timeout<T, F>(step: &'static str, timeout: Option<Duration>, f: F) -> ReconcileResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let Some(timeout) = timeout else {
        return Ok(f());
    };

    let (tx, rx) = bounded::<T>(1);
    thread::Builder::new()
        .name(format!("gig-{}", step.replace(' ', "-")))
        .spawn(move || {
            let _ = tx.send(f());
        })
        .map_err(|_| ReconcileError::Disconnected { step })?;

    rx.recv_timeout(timeout).map_err(|err| match err {
        RecvTimeoutError::Timeout => ReconcileError::Timeout {
            step,
            duration_ms: duration_ms(timeout),
        },
        RecvTimeoutError::Disconnected => ReconcileError::Disconnected { step },
    })
}
