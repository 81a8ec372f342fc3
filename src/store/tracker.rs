//! Loading/error bookkeeping shared by every store
//!
//! Every action runs through [`Tracker::run`]: loading is raised and the
//! previous error cleared, the call is awaited, a failure's message is
//! recorded and the error handed back to the caller, and loading is lowered
//! again on every path (the guard drops even when the future is cancelled).

use crate::error::{PanelError, PanelResult};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::warn;

#[derive(Debug, Default)]
pub struct Tracker {
    /// Nested actions (an action re-fetching after itself) stack up here
    in_flight: AtomicUsize,
    error: RwLock<Option<String>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Last recorded failure message
    pub fn error(&self) -> Option<String> {
        self.error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_error(&self) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn record(&self, err: &PanelError) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = Some(err.user_message());
    }

    /// Raise the loading flag until the returned guard drops
    pub fn begin(&self) -> LoadingGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.clear_error();
        LoadingGuard { tracker: self }
    }

    /// Run one store action with uniform loading/error handling
    pub async fn run<T, F>(&self, action: &str, fut: F) -> PanelResult<T>
    where
        F: Future<Output = PanelResult<T>>,
    {
        let _guard = self.begin();
        fut.await.map_err(|err| {
            warn!("❌ {} failed: {}", action, err);
            self.record(&err);
            err
        })
    }
}

pub struct LoadingGuard<'a> {
    tracker: &'a Tracker,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
