//! Single-flight token refresh
//!
//! One [`RefreshCoordinator`] lives inside each built client. The first
//! request to need a refresh runs it; every request that needs one while it
//! is in flight waits on a one-shot channel and receives the same outcome.

use super::error::RefreshError;
use std::collections::VecDeque;
use std::future::Future;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

/// Outcome handed to every request waiting on a refresh
pub type RefreshOutcome = Result<String, RefreshError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

/// Refresh gate state
#[derive(Debug, Default)]
pub enum RefreshState {
    #[default]
    Idle,
    /// A refresh is outstanding; waiters are settled in insertion order
    Refreshing { waiters: VecDeque<Waiter> },
}

/// Gate guaranteeing at most one refresh in flight
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    started: AtomicU64,
    /// Access token issued by the last refresh, cleared when one fails
    latest: Mutex<Option<String>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), RefreshState::Refreshing { .. })
    }

    /// Number of requests currently queued behind the in-flight refresh
    pub fn queued(&self) -> usize {
        match &*self.lock() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// True when `token` is what the most recent refresh issued; always
    /// false after a failed refresh
    pub fn is_latest(&self, token: &str) -> bool {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            == Some(token)
    }

    /// Number of refreshes started over the coordinator's lifetime
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Run `refresh` unless one is already in flight, in which case wait for
    /// that one's outcome instead
    pub async fn run<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        let waiting = {
            let mut state = self.lock();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push_back(tx);
                    debug!(queued = waiters.len(), "Refresh in flight, queuing request");
                    Some(rx)
                }
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: VecDeque::new(),
                    };
                    None
                }
            }
        };

        if let Some(rx) = waiting {
            return rx.await.unwrap_or(Err(RefreshError::Aborted));
        }

        self.started.fetch_add(1, Ordering::Relaxed);
        let flight = Flight {
            coordinator: self,
            settled: false,
        };
        let outcome = refresh().await;
        flight.settle(&outcome);
        outcome
    }

    /// Reopen the gate and hand back whoever was waiting
    fn finish(&self) -> VecDeque<Waiter> {
        match mem::take(&mut *self.lock()) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => VecDeque::new(),
        }
    }
}

/// Reopens the gate even if the refreshing future is dropped mid-flight;
/// waiters then observe a closed channel
struct Flight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Flight<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        *self
            .coordinator
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = outcome.as_ref().ok().cloned();
        let waiters = self.coordinator.finish();
        debug!(waiters = waiters.len(), ok = outcome.is_ok(), "Refresh settled");
        for waiter in waiters {
            // A waiter whose request was dropped is fine
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            drop(self.coordinator.finish());
        }
    }
}
