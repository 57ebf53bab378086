//! Authoritative client-side partition of transactions
//!
//! Every loaded transaction lives in exactly one of two sets: *pending*
//! (awaiting confirmation) or *confirmed* (committed). The store is the only
//! component allowed to mutate that partition, and it does so exclusively in
//! response to completed network results — never optimistically.

use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::reconciliation::summary::summarize;
use crate::traits::ReconciliationApi;
use crate::types::{
    FinancialSummary, ImportedTransaction, ReconcileError, ReconcileResult, ReconciliationStatus,
};

#[derive(Debug, Default)]
struct PartitionState {
    pending: Vec<ImportedTransaction>,
    confirmed: Vec<ImportedTransaction>,
    initial_summary: Option<FinancialSummary>,
    status: ReconciliationStatus,
    loaded_once: bool,
}

/// In-memory pending/confirmed partition plus the reconciliation's observed
/// lifecycle status.
pub struct ReconciliationStateStore<A: ReconciliationApi> {
    api: Arc<A>,
    state: RwLock<PartitionState>,
    /// Held across the pending fetch; a second load finding it taken is
    /// suppressed instead of queued
    load_gate: Mutex<()>,
}

impl<A: ReconciliationApi> ReconciliationStateStore<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: RwLock::new(PartitionState::default()),
            load_gate: Mutex::new(()),
        }
    }

    /// Load the pending set from the collaborator.
    ///
    /// Returns `Ok(None)` when a load is already in flight (the second call
    /// is suppressed, not queued). A fetch failure propagates and leaves the
    /// partition untouched. On the first successful load the as-imported
    /// summary snapshot is computed and frozen for the session; it is not
    /// recomputed as transactions are confirmed later.
    pub async fn load_pending(
        &self,
        reconciliation_id: &str,
    ) -> ReconcileResult<Option<Vec<ImportedTransaction>>> {
        let Ok(_guard) = self.load_gate.try_lock() else {
            debug!("pending load already in flight, suppressing");
            return Ok(None);
        };

        let fetched = self.api.fetch_pending(reconciliation_id).await?;
        let transactions = dedup_by_id(fetched);

        let mut state = self.state.write().unwrap();
        // keep the partition disjoint: anything already confirmed locally
        // stays out of pending even if the collaborator still lists it
        let confirmed_ids: Vec<&str> = state.confirmed.iter().map(|t| t.id.as_str()).collect();
        let transactions: Vec<ImportedTransaction> = transactions
            .into_iter()
            .filter(|t| !confirmed_ids.contains(&t.id.as_str()))
            .collect();

        if !state.loaded_once {
            state.initial_summary = Some(summarize(&transactions));
            state.loaded_once = true;
        }
        state.pending = transactions.clone();
        debug!(count = transactions.len(), "pending transactions loaded");
        Ok(Some(transactions))
    }

    /// Refresh the confirmed view, tolerating heterogeneous collaborator
    /// responses.
    ///
    /// Sources are probed in priority order — the dedicated `confirmadas`
    /// group, a filter of the "all transactions" group by confirmed marker,
    /// then the dedicated fallback endpoint — and the first non-empty one
    /// wins. Total failure degrades to an empty set: this view is
    /// supplementary and must never block the primary workflow.
    pub async fn load_confirmed(&self, reconciliation_id: &str) -> Vec<ImportedTransaction> {
        let confirmed = self
            .probe_confirmed_sources(reconciliation_id)
            .await
            .unwrap_or_default();

        let mut state = self.state.write().unwrap();
        let pending_ids: Vec<&str> = state.pending.iter().map(|t| t.id.as_str()).collect();
        let confirmed: Vec<ImportedTransaction> = confirmed
            .into_iter()
            .filter(|t| !pending_ids.contains(&t.id.as_str()))
            .collect();
        state.confirmed = confirmed.clone();
        confirmed
    }

    async fn probe_confirmed_sources(
        &self,
        reconciliation_id: &str,
    ) -> Option<Vec<ImportedTransaction>> {
        match self.api.fetch_transactions(reconciliation_id).await {
            Ok(breakdown) => {
                if let Some(list) = breakdown.confirmed.and_then(non_empty) {
                    debug!(count = list.len(), "confirmed view from dedicated group");
                    return Some(list);
                }
                if let Some(all) = breakdown.all {
                    let derived: Vec<ImportedTransaction> = all
                        .into_iter()
                        .filter(ImportedTransaction::has_confirmed_marker)
                        .collect();
                    if let Some(list) = non_empty(derived) {
                        debug!(count = list.len(), "confirmed view derived from markers");
                        return Some(list);
                    }
                }
            }
            Err(err) => {
                debug!(%err, "grouped-transactions fetch failed, trying fallback endpoint");
            }
        }

        match self.api.fetch_confirmed(reconciliation_id).await {
            Ok(list) => non_empty(list).map(|list| {
                debug!(count = list.len(), "confirmed view from fallback endpoint");
                list
            }),
            Err(err) => {
                warn!(%err, "all confirmed-view sources failed, degrading to empty");
                None
            }
        }
    }

    /// Atomically remove the given ids from pending.
    ///
    /// Returns the ids actually removed. The confirmed view is refreshed
    /// separately via [`Self::load_confirmed`], since the collaborator may
    /// attach server-computed fields the client cannot reproduce.
    pub fn move_to_confirmed(&self, transaction_ids: &[String]) -> Vec<String> {
        let mut state = self.state.write().unwrap();
        let mut moved = Vec::new();
        state.pending.retain(|txn| {
            if transaction_ids.contains(&txn.id) {
                moved.push(txn.id.clone());
                false
            } else {
                true
            }
        });
        moved
    }

    /// Finalize the reconciliation.
    ///
    /// Refused client-side, with zero network calls, while pending
    /// transactions remain.
    pub async fn finalize(&self, reconciliation_id: &str) -> ReconcileResult<()> {
        let remaining = self.pending_len();
        if remaining > 0 {
            return Err(ReconcileError::FinalizeBlocked(remaining));
        }
        self.api.finalize(reconciliation_id).await?;
        self.set_status(ReconciliationStatus::Completed);
        Ok(())
    }

    /// Snapshot of the pending set
    pub fn pending(&self) -> Vec<ImportedTransaction> {
        self.state.read().unwrap().pending.clone()
    }

    /// Snapshot of the confirmed set
    pub fn confirmed(&self) -> Vec<ImportedTransaction> {
        self.state.read().unwrap().confirmed.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.state.read().unwrap().pending.len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_len() > 0
    }

    /// The frozen as-imported summary, once the first load succeeded
    pub fn initial_summary(&self) -> Option<FinancialSummary> {
        self.state.read().unwrap().initial_summary.clone()
    }

    /// Last observed lifecycle status
    pub fn status(&self) -> ReconciliationStatus {
        self.state.read().unwrap().status
    }

    pub fn set_status(&self, status: ReconciliationStatus) {
        self.state.write().unwrap().status = status;
    }
}

/// Drop duplicate ids, first occurrence wins (ids are unique within a
/// reconciliation; a collaborator that repeats one is not trusted twice)
fn dedup_by_id(transactions: Vec<ImportedTransaction>) -> Vec<ImportedTransaction> {
    let mut seen = std::collections::HashSet::new();
    transactions
        .into_iter()
        .filter(|txn| seen.insert(txn.id.clone()))
        .collect()
}

fn non_empty(list: Vec<ImportedTransaction>) -> Option<Vec<ImportedTransaction>> {
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}
