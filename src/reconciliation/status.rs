//! Import-job status tracking
//!
//! The tracker is the sole gate in front of transaction loading: while the
//! import job reports `processando`, nothing downstream may fetch the
//! pending set. Polling is a bounded, cancellable task rather than a bare
//! repeating timer: it resolves exactly once, or is cancelled by the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::traits::ReconciliationApi;
use crate::types::{ImportStatus, ReconciliationStatus};

/// Polling parameters.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed delay between status fetches
    pub interval: Duration,
    /// Upper bound on total polling time before giving up
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(120),
        }
    }
}

/// How a wait for the import job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportWait {
    /// The job reached a terminal status
    Terminal(ImportStatus),
    /// The initial status fetch failed; treated as "not processing" so the
    /// rest of the workflow can still attempt to load transactions
    Unknown,
    /// The job was still processing when the wait bound expired; check back
    /// later
    TimedOut,
    /// The owning session cancelled the wait
    Cancelled,
}

impl ImportWait {
    /// Whether transaction loading may proceed after this outcome
    pub fn opens_gate(&self) -> bool {
        matches!(self, ImportWait::Terminal(_) | ImportWait::Unknown)
    }
}

/// Polls the collaborator's status endpoint until the import job settles.
pub struct ImportStatusTracker<A: ReconciliationApi> {
    api: Arc<A>,
    config: PollConfig,
    progress: watch::Sender<Option<ImportStatus>>,
}

impl<A: ReconciliationApi> ImportStatusTracker<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self::with_config(api, PollConfig::default())
    }

    pub fn with_config(api: Arc<A>, config: PollConfig) -> Self {
        let (progress, _) = watch::channel(None);
        Self {
            api,
            config,
            progress,
        }
    }

    /// Subscribe to progress updates (the latest fetched status)
    pub fn progress(&self) -> watch::Receiver<Option<ImportStatus>> {
        self.progress.subscribe()
    }

    /// The most recently fetched status, if any fetch has succeeded yet
    pub fn last_status(&self) -> Option<ImportStatus> {
        self.progress.borrow().clone()
    }

    /// Wait until the import job reaches a terminal status.
    ///
    /// The initial fetch happens immediately; if it reports a terminal
    /// status no polling starts at all. A failed initial fetch degrades to
    /// [`ImportWait::Unknown`] rather than dead-locking the workflow.
    /// Transient errors on subsequent polls are swallowed and retried on the
    /// next tick; only a fetched `erro` status is terminal-and-reported.
    pub async fn wait_for_terminal(
        &self,
        reconciliation_id: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> ImportWait {
        let first = match self.api.fetch_import_status(reconciliation_id).await {
            Ok(status) => status,
            Err(err) => {
                warn!(%err, "initial status fetch failed, treating import as not processing");
                return ImportWait::Unknown;
            }
        };
        self.progress.send_replace(Some(first.clone()));
        if let Some(outcome) = Self::terminal_outcome(first) {
            return outcome;
        }
        // a cancellation sent before the wait started never versions the
        // channel again, so check the current value once up front
        if *cancel.borrow() {
            return ImportWait::Cancelled;
        }

        let deadline = Instant::now() + self.config.max_wait;
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick of an interval fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    // a dropped sender means the owning session is gone
                    if changed.is_err() || *cancel.borrow() {
                        debug!("status polling cancelled");
                        return ImportWait::Cancelled;
                    }
                }
                _ = ticker.tick() => {
                    if Instant::now() >= deadline {
                        warn!(
                            max_wait_secs = self.config.max_wait.as_secs(),
                            "import still processing past the wait bound"
                        );
                        return ImportWait::TimedOut;
                    }
                    match self.api.fetch_import_status(reconciliation_id).await {
                        Ok(status) => {
                            self.progress.send_replace(Some(status.clone()));
                            if let Some(outcome) = Self::terminal_outcome(status) {
                                return outcome;
                            }
                        }
                        Err(err) => {
                            debug!(%err, "transient status poll failure, retrying on next tick");
                        }
                    }
                }
            }
        }
    }

    fn terminal_outcome(status: ImportStatus) -> Option<ImportWait> {
        if !status.status.is_terminal() {
            debug!(progress = status.progress, "import still processing");
            return None;
        }
        if status.status == ReconciliationStatus::Failed {
            warn!(errors = ?status.errors, "import job failed");
        }
        Some(ImportWait::Terminal(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_api::MemoryApi;

    fn processing(progress: u8) -> ImportStatus {
        let mut status = ImportStatus::of(ReconciliationStatus::Processing);
        status.progress = progress;
        status
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_on_first_fetch_skips_polling() {
        let api = Arc::new(MemoryApi::new());
        api.push_status(ImportStatus::of(ReconciliationStatus::Pending));

        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let tracker = ImportStatusTracker::new(api.clone());
        let outcome = tracker.wait_for_terminal("r1", cancel_rx).await;

        assert!(matches!(
            outcome,
            ImportWait::Terminal(s) if s.status == ReconciliationStatus::Pending
        ));
        assert_eq!(api.status_fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_terminal_and_surfaces_progress() {
        let api = Arc::new(MemoryApi::new());
        api.push_status(processing(10));
        api.push_status(processing(60));
        api.push_status(ImportStatus::of(ReconciliationStatus::Completed));

        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let tracker = ImportStatusTracker::new(api.clone());
        let progress = tracker.progress();
        let outcome = tracker.wait_for_terminal("r1", cancel_rx).await;

        assert!(matches!(
            outcome,
            ImportWait::Terminal(s) if s.status == ReconciliationStatus::Completed
        ));
        assert_eq!(api.status_fetch_calls(), 3);
        let last = progress.borrow().clone().unwrap();
        assert_eq!(last.status, ReconciliationStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_fetch_failure_degrades_to_unknown() {
        let api = Arc::new(MemoryApi::new());
        api.push_status_failure();

        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let tracker = ImportStatusTracker::new(api);
        let outcome = tracker.wait_for_terminal("r1", cancel_rx).await;

        assert_eq!(outcome, ImportWait::Unknown);
        assert!(outcome.opens_gate());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_poll_failures_are_swallowed() {
        let api = Arc::new(MemoryApi::new());
        api.push_status(processing(10));
        api.push_status_failure();
        api.push_status_failure();
        api.push_status(ImportStatus::of(ReconciliationStatus::Pending));

        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let tracker = ImportStatusTracker::new(api.clone());
        let outcome = tracker.wait_for_terminal("r1", cancel_rx).await;

        assert!(matches!(outcome, ImportWait::Terminal(_)));
        assert_eq!(api.status_fetch_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_bounded() {
        let api = Arc::new(MemoryApi::new());
        // queue drains into the derived default, so script nothing and seed
        // a record stuck in processing
        api.seed_processing_forever("r1");

        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let tracker = ImportStatusTracker::new(api);
        let outcome = tracker.wait_for_terminal("r1", cancel_rx).await;

        assert_eq!(outcome, ImportWait::TimedOut);
        assert!(!outcome.opens_gate());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_started_after_cancellation_returns_immediately() {
        let api = Arc::new(MemoryApi::new());
        api.seed_processing_forever("r1");

        let (cancel_tx, cancel_rx) = watch::channel(false);
        cancel_tx.send_replace(true);

        let tracker = ImportStatusTracker::new(api.clone());
        let outcome = tracker.wait_for_terminal("r1", cancel_rx).await;

        assert_eq!(outcome, ImportWait::Cancelled);
        assert_eq!(api.status_fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_poller() {
        let api = Arc::new(MemoryApi::new());
        api.seed_processing_forever("r1");

        let tracker = Arc::new(ImportStatusTracker::new(api));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let waiter = {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move { tracker.wait_for_terminal("r1", cancel_rx).await })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel_tx.send_replace(true);

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, ImportWait::Cancelled);
    }
}
