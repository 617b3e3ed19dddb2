//! Waiter - Poll a remote resource until a condition over its snapshot holds
//!
//! Remote create/update/delete operations are asynchronous: the caller has to
//! fetch the resource repeatedly until its lifecycle state reaches what it is
//! waiting for. [`wait_for`] separates the fetch operation from the stop
//! predicate, so "wait for ACTIVE", "wait for DELETED" and "wait for healthy"
//! differ only in the pair passed in.
//!
//! Each call owns its own loop and shares nothing with other calls. Dropping
//! the returned future cancels the wait.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::lifecycle::{LifecycleState, Snapshot};

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The service reported that the resource does not exist
    NotFound,
    /// Network or service hiccup worth retrying
    Transient,
    /// Anything else; never retried
    Fatal,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::NotFound => write!(f, "not found"),
            FetchErrorKind::Transient => write!(f, "transient"),
            FetchErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Error returned by a fetch operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
    /// HTTP status reported by the service, when there was one
    pub status: Option<u16>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::NotFound, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Transient, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Fatal, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FetchErrorKind::NotFound
    }
}

/// What a not-found fetch means for the wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Not-found is an error
    Fail,
    /// Not-found is transient (the resource may not be visible yet after create)
    Retry,
    /// Not-found confirms deletion; only meant for delete-waits
    TreatAsDeleted,
}

/// Retry budget and backoff for transient fetch failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of failed fetches tolerated before giving up
    pub max_attempts: u32,
    /// Delay after the first failure
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_delays(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay;
        self
    }

    /// Delay before retrying after the `attempt`-th consecutive failure (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2,
        }
    }
}

/// Parameters of a single wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Maximum time spent waiting, fetches included
    pub timeout: Duration,
    /// Delay between fetches while the condition does not hold
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
    pub not_found: NotFoundPolicy,
}

impl WaitConfig {
    /// Default poll interval between fetches
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
            not_found: NotFoundPolicy::Fail,
        }
    }

    /// Wait after a create: the resource may briefly be invisible
    pub fn until_created(timeout: Duration) -> Self {
        Self::new(timeout).with_not_found(NotFoundPolicy::Retry)
    }

    pub fn until_updated(timeout: Duration) -> Self {
        Self::new(timeout)
    }

    /// Wait after a delete: not-found confirms the deletion
    pub fn until_deleted(timeout: Duration) -> Self {
        Self::new(timeout).with_not_found(NotFoundPolicy::TreatAsDeleted)
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_not_found(mut self, not_found: NotFoundPolicy) -> Self {
        self.not_found = not_found;
        self
    }
}

/// Successful end of a wait
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<S> {
    /// The predicate held for this snapshot
    Reached(S),
    /// The resource is gone (only with `NotFoundPolicy::TreatAsDeleted`)
    Deleted,
}

impl<S> WaitOutcome<S> {
    pub fn is_deleted(&self) -> bool {
        matches!(self, WaitOutcome::Deleted)
    }

    pub fn into_snapshot(self) -> Option<S> {
        match self {
            WaitOutcome::Reached(snapshot) => Some(snapshot),
            WaitOutcome::Deleted => None,
        }
    }
}

/// Failed end of a wait
#[derive(Debug)]
pub enum WaitError<S> {
    /// The deadline passed before the predicate held
    Timeout { elapsed: Duration, last: Option<S> },
    /// A fetch failed with an error that is not retried
    Fetch { error: FetchError, last: Option<S> },
    /// Transient failures used up the retry budget
    RetriesExhausted {
        attempts: u32,
        error: FetchError,
        last: Option<S>,
    },
}

impl<S> WaitError<S> {
    /// Last snapshot fetched before the wait failed
    pub fn last_snapshot(&self) -> Option<&S> {
        match self {
            WaitError::Timeout { last, .. }
            | WaitError::Fetch { last, .. }
            | WaitError::RetriesExhausted { last, .. } => last.as_ref(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }

    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            WaitError::Timeout { .. } => None,
            WaitError::Fetch { error, .. } | WaitError::RetriesExhausted { error, .. } => {
                Some(error)
            }
        }
    }
}

impl<S: Snapshot> WaitError<S> {
    /// Lifecycle state of the last snapshot, if any
    pub fn last_state(&self) -> Option<&LifecycleState> {
        self.last_snapshot().and_then(Snapshot::lifecycle_state)
    }
}

impl<S: Snapshot> fmt::Display for WaitError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self
            .last_state()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<none>".to_string());

        match self {
            WaitError::Timeout { .. } => write!(
                f,
                "operation timed out waiting for condition, last observed state = {}",
                state
            ),
            WaitError::Fetch { error, .. } => {
                write!(f, "{}, last observed state = {}", error, state)
            }
            WaitError::RetriesExhausted {
                attempts, error, ..
            } => write!(
                f,
                "gave up after {} failed fetches ({}), last observed state = {}",
                attempts, error, state
            ),
        }
    }
}

impl<S: Snapshot + fmt::Debug> std::error::Error for WaitError<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.fetch_error()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Fetch snapshots until `predicate` holds, the deadline passes, or a fetch
/// fails in a way that is not retried
pub async fn wait_for<S, F, Fut, P>(
    mut fetch: F,
    predicate: P,
    config: &WaitConfig,
) -> Result<WaitOutcome<S>, WaitError<S>>
where
    S: Snapshot,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, FetchError>>,
    P: Fn(&S) -> bool,
{
    let started = Instant::now();
    let deadline = started + config.timeout;
    let mut last: Option<S> = None;
    let mut failures: u32 = 0;
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let Ok(result) = tokio::time::timeout(remaining, fetch()).await else {
            return Err(WaitError::Timeout {
                elapsed: started.elapsed(),
                last,
            });
        };

        let delay = match result {
            Ok(snapshot) => {
                if predicate(&snapshot) {
                    log::debug!(
                        "Condition met after {} polls in {:?}",
                        polls,
                        started.elapsed()
                    );
                    return Ok(WaitOutcome::Reached(snapshot));
                }
                log::debug!(
                    "Poll {}: state {} does not satisfy condition",
                    polls,
                    describe(snapshot.lifecycle_state())
                );
                last = Some(snapshot);
                config.poll_interval
            }
            Err(error) => match (error.kind, config.not_found) {
                (FetchErrorKind::NotFound, NotFoundPolicy::TreatAsDeleted) => {
                    log::debug!("Poll {}: resource not found, treating as deleted", polls);
                    return Ok(WaitOutcome::Deleted);
                }
                (FetchErrorKind::Fatal, _) | (FetchErrorKind::NotFound, NotFoundPolicy::Fail) => {
                    return Err(WaitError::Fetch { error, last });
                }
                (FetchErrorKind::Transient, _) | (FetchErrorKind::NotFound, NotFoundPolicy::Retry) => {
                    failures += 1;
                    if failures > config.retry.max_attempts {
                        return Err(WaitError::RetriesExhausted {
                            attempts: failures,
                            error,
                            last,
                        });
                    }
                    let delay = config.retry.delay_for(failures);
                    log::debug!(
                        "Poll {}: retrying in {:?} after {} ({}/{})",
                        polls,
                        delay,
                        error,
                        failures,
                        config.retry.max_attempts
                    );
                    delay
                }
            },
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(WaitError::Timeout {
                elapsed: now - started,
                last,
            });
        }
        tokio::time::sleep(delay.min(deadline - now)).await;
    }
}

/// Stop when the snapshot is in `state`
pub fn lifecycle_is<S: Snapshot>(state: LifecycleState) -> impl Fn(&S) -> bool {
    move |snapshot: &S| snapshot.lifecycle_state() == Some(&state)
}

/// Stop when the snapshot is in any of `states`
pub fn lifecycle_in<S: Snapshot>(states: Vec<LifecycleState>) -> impl Fn(&S) -> bool {
    move |snapshot: &S| {
        snapshot
            .lifecycle_state()
            .is_some_and(|current| states.contains(current))
    }
}

/// Stop as soon as the snapshot has left `state`
pub fn lifecycle_not<S: Snapshot>(state: LifecycleState) -> impl Fn(&S) -> bool {
    move |snapshot: &S| snapshot.lifecycle_state() != Some(&state)
}

fn describe(state: Option<&LifecycleState>) -> &str {
    state.map(LifecycleState::as_str).unwrap_or("<none>")
}
