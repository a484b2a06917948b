//! Fixed-interval fetch-and-reconcile. There is no push channel; every view
//! owns one poll loop that re-fetches on a timer and immediately after a local
//! mutation invalidates it. Renderers read the latest snapshot from a watch
//! channel and never trigger fetches themselves.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::warn;

/// Chat-style views (own thread, one admin thread).
pub const CHAT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Overview views (admin user list, notifications).
pub const OVERVIEW_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Never fetched.
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// Last fetch succeeded; `data` is current as of that fetch.
    Rendered,
    /// Last fetch failed; `data` is the last-known-good value, if any.
    Stale,
}

#[derive(Debug, Clone)]
pub struct ViewSnapshot<T> {
    pub phase: Phase,
    pub data: Option<T>,
}

/// One polled view. Dropping the poller stops its loop.
pub struct Poller<T> {
    rx: watch::Receiver<ViewSnapshot<T>>,
    invalidate: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> Poller<T> {
    /// Start the loop: fetch immediately, then again every `interval` or as
    /// soon as the view is invalidated, whichever comes first. Only one fetch
    /// is ever in flight — the loop is sequential by construction.
    pub fn spawn<F, Fut, E>(interval: Duration, mut fetch: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        E: std::fmt::Display + Send + 'static,
    {
        let (tx, rx) = watch::channel(ViewSnapshot {
            phase: Phase::Idle,
            data: None,
        });
        let invalidate = Arc::new(Notify::new());
        let notify = invalidate.clone();

        let task = tokio::spawn(async move {
            loop {
                tx.send_modify(|s| s.phase = Phase::Fetching);

                match fetch().await {
                    Ok(data) => {
                        let _ = tx.send(ViewSnapshot {
                            phase: Phase::Rendered,
                            data: Some(data),
                        });
                    }
                    Err(e) => {
                        // keep rendering the last-known-good data
                        warn!("poll fetch failed: {}", e);
                        tx.send_modify(|s| s.phase = Phase::Stale);
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = notify.notified() => {}
                }
            }
        });

        Self {
            rx,
            invalidate,
            task,
        }
    }

    /// Force an out-of-cycle re-fetch, e.g. right after a mutation the view
    /// should reflect. A permit is stored if a fetch is already in flight, so
    /// the call is never lost.
    pub fn invalidate(&self) {
        self.invalidate.notify_one();
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot<T>> {
        self.rx.clone()
    }

    pub fn snapshot(&self) -> ViewSnapshot<T> {
        self.rx.borrow().clone()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
