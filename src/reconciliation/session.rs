//! Reconciliation session orchestrator
//!
//! Wires the tracker, state store, matcher, and confirmation engine into the
//! workflow the validation screen drives: wait for the import job, load and
//! seed pending transactions, take operator assignments, commit them one by
//! one or in batch, and finalize once nothing is pending.

use std::sync::Arc;

use tokio::sync::watch;

use crate::reconciliation::confirm::{
    ready_requests, suggested_requests, BatchConfirmationEngine,
};
use crate::reconciliation::matcher::TransactionMatcher;
use crate::reconciliation::status::{ImportStatusTracker, ImportWait, PollConfig};
use crate::reconciliation::store::ReconciliationStateStore;
use crate::reconciliation::summary::{resolve_summary, SummarySources};
use crate::traits::ReconciliationApi;
use crate::types::*;

/// One operator session over one reconciliation.
pub struct ReconciliationSession<A: ReconciliationApi> {
    reconciliation_id: String,
    api: Arc<A>,
    tracker: ImportStatusTracker<A>,
    store: ReconciliationStateStore<A>,
    matcher: TransactionMatcher,
    engine: BatchConfirmationEngine<A>,
    cancel: watch::Sender<bool>,
    reconciliation: Option<Reconciliation>,
}

impl<A: ReconciliationApi> ReconciliationSession<A> {
    pub fn new(api: Arc<A>, reconciliation_id: impl Into<String>) -> Self {
        Self::with_poll_config(api, reconciliation_id, PollConfig::default())
    }

    pub fn with_poll_config(
        api: Arc<A>,
        reconciliation_id: impl Into<String>,
        poll: PollConfig,
    ) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            reconciliation_id: reconciliation_id.into(),
            tracker: ImportStatusTracker::with_config(Arc::clone(&api), poll),
            store: ReconciliationStateStore::new(Arc::clone(&api)),
            matcher: TransactionMatcher::new(),
            engine: BatchConfirmationEngine::new(Arc::clone(&api)),
            api,
            cancel,
            reconciliation: None,
        }
    }

    pub fn reconciliation_id(&self) -> &str {
        &self.reconciliation_id
    }

    /// Fetch the reconciliation entity and record its lifecycle status
    pub async fn refresh_reconciliation(&mut self) -> ReconcileResult<Reconciliation> {
        let reconciliation = self.api.fetch_reconciliation(&self.reconciliation_id).await?;
        self.store.set_status(reconciliation.status);
        self.reconciliation = Some(reconciliation.clone());
        Ok(reconciliation)
    }

    /// Wait for the import job to settle.
    ///
    /// While this is running (or after a timed-out wait) the import gate
    /// stays closed and [`Self::load_pending`] refuses to fetch.
    pub async fn wait_for_import(&self) -> ImportWait {
        let outcome = self
            .tracker
            .wait_for_terminal(&self.reconciliation_id, self.cancel.subscribe())
            .await;
        if let ImportWait::Terminal(status) = &outcome {
            self.store.set_status(status.status);
        }
        outcome
    }

    /// Subscribe to import progress updates
    pub fn import_progress(&self) -> watch::Receiver<Option<ImportStatus>> {
        self.tracker.progress()
    }

    /// Stop any in-flight status polling; called when the owning screen
    /// goes away
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    fn import_gate_open(&self) -> bool {
        self.tracker
            .last_status()
            .map(|s| s.status != ReconciliationStatus::Processing)
            .unwrap_or(true)
    }

    /// Load the pending set and seed assignments from suggestions.
    ///
    /// Refused while the last observed import status is still processing.
    /// Returns `Ok(None)` when a load was already in flight. An empty result
    /// resets the matcher's seeding history: a fresh reconciliation starts
    /// from a clean slate.
    pub async fn load_pending(&mut self) -> ReconcileResult<Option<usize>> {
        if !self.import_gate_open() {
            return Err(ReconcileError::ImportRunning);
        }

        let Some(transactions) = self.store.load_pending(&self.reconciliation_id).await? else {
            return Ok(None);
        };

        if transactions.is_empty() {
            self.matcher.reset();
        }
        self.matcher.seed_assignments(&transactions);
        Ok(Some(transactions.len()))
    }

    /// Refresh the confirmed view (supplementary; degrades to empty)
    pub async fn refresh_confirmed(&self) -> Vec<ImportedTransaction> {
        self.store.load_confirmed(&self.reconciliation_id).await
    }

    pub fn pending(&self) -> Vec<ImportedTransaction> {
        self.store.pending()
    }

    pub fn confirmed(&self) -> Vec<ImportedTransaction> {
        self.store.confirmed()
    }

    /// Manually assign an account to a pending transaction
    pub fn set_assignment(
        &mut self,
        transaction_id: &str,
        account_id: impl Into<String>,
    ) -> ReconcileResult<()> {
        if !self.store.pending().iter().any(|t| t.id == transaction_id) {
            return Err(ReconcileError::Validation(format!(
                "Transaction '{}' is not pending",
                transaction_id
            )));
        }
        self.matcher.set_assignment(transaction_id, account_id);
        Ok(())
    }

    pub fn assignment(&self, transaction_id: &str) -> Option<&str> {
        self.matcher.assignment(transaction_id)
    }

    pub fn is_ready(&self, transaction_id: &str) -> bool {
        self.matcher.is_ready(transaction_id)
    }

    /// Number of pending transactions ready to confirm
    pub fn ready_count(&self) -> usize {
        self.matcher.ready_count(&self.store.pending())
    }

    /// Commit the current assignment of one transaction.
    ///
    /// Local state changes only after the server acknowledged the write:
    /// the transaction moves to confirmed, its assignment is dropped, and
    /// the confirmed view is refreshed afterwards.
    pub async fn confirm_one(&mut self, transaction_id: &str) -> ReconcileResult<()> {
        let account_id = self
            .matcher
            .assignment(transaction_id)
            .ok_or_else(|| {
                ReconcileError::Validation(format!(
                    "No account selected for transaction '{}'",
                    transaction_id
                ))
            })?
            .to_string();

        let request = ConfirmationRequest::new(transaction_id, account_id);
        self.engine.confirm_one(&request).await?;

        self.store.move_to_confirmed(&[transaction_id.to_string()]);
        self.matcher.clear_assignment(transaction_id);
        self.refresh_confirmed().await;
        Ok(())
    }

    /// Commit every pending transaction that carries a suggestion
    pub async fn confirm_all_suggested(&mut self) -> ReconcileResult<BatchOutcome> {
        let requests = suggested_requests(&self.store.pending());
        self.run_batch(requests).await
    }

    /// Commit every pending transaction with any assignment, seeded or
    /// manual
    pub async fn confirm_all_ready(&mut self) -> ReconcileResult<BatchOutcome> {
        let requests = ready_requests(&self.store.pending(), &self.matcher);
        self.run_batch(requests).await
    }

    // One round trip, then local effects strictly from the per-item
    // details: successes move, failures keep their assignments for retry.
    // The confirmed refresh is issued only after the move is applied.
    async fn run_batch(&mut self, requests: Vec<ConfirmationRequest>) -> ReconcileResult<BatchOutcome> {
        let outcome = self.engine.confirm_batch(&requests).await?;

        let moved = self.store.move_to_confirmed(&outcome.succeeded_ids());
        self.matcher.clear_assignments(&moved);
        self.refresh_confirmed().await;
        Ok(outcome)
    }

    /// Finalize the reconciliation.
    ///
    /// Refused locally while pending transactions remain, and once the
    /// reconciliation is already completed.
    pub async fn finalize(&mut self) -> ReconcileResult<()> {
        if let Some(reconciliation) = &self.reconciliation {
            if reconciliation.status == ReconciliationStatus::Completed {
                return Err(ReconcileError::Validation(
                    "Reconciliation is already completed".to_string(),
                ));
            }
        }
        self.store.finalize(&self.reconciliation_id).await?;
        if let Some(reconciliation) = &mut self.reconciliation {
            reconciliation.status = ReconciliationStatus::Completed;
        }
        Ok(())
    }

    /// Resolve the canonical financial snapshot from every available source
    pub fn summary(&self) -> FinancialSummary {
        let last_status = self.tracker.last_status();
        let initial = self.store.initial_summary();
        let pending = self.store.pending();

        resolve_summary(SummarySources {
            status_summary: last_status.as_ref().and_then(|s| s.summary.as_ref()),
            initial_summary: initial.as_ref(),
            persisted_summary: self
                .reconciliation
                .as_ref()
                .and_then(|r| r.summary.as_ref()),
            pending: &pending,
        })
    }
}

impl<A: ReconciliationApi> Drop for ReconciliationSession<A> {
    fn drop(&mut self) {
        // stop the poller with the session, like a screen unmount
        let _ = self.cancel.send(true);
    }
}
