//! In-memory collaborator implementation for testing and development
//!
//! Plays the backend's role end to end: it owns the server-side partition,
//! applies confirmations, derives import statuses, and exposes knobs for
//! scripting statuses, injecting failures, and reshaping the grouped
//! transactions response. Tests drive every failure path of the workflow
//! through these knobs instead of a real HTTP server.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::traits::ReconciliationApi;
use crate::types::*;

/// Which groups the grouped-transactions endpoint populates.
///
/// The real collaborator is not stable about this; tests pick a shape to
/// exercise each branch of the confirmed-view fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakdownShape {
    /// `confirmadas` (and `pendentes`) populated
    #[default]
    Dedicated,
    /// only `todas`, confirmed rows recognizable by their markers
    AllWithMarkers,
    /// no groups at all; callers must use the fallback endpoint
    NoGroups,
}

#[derive(Debug, Clone)]
struct ReconciliationRecord {
    reconciliation: Reconciliation,
    pending: Vec<ImportedTransaction>,
    confirmed: Vec<ImportedTransaction>,
}

#[derive(Debug, Default)]
struct Counters {
    pending_fetch: usize,
    status_fetch: usize,
    confirmed_fetch: usize,
    confirm: usize,
    confirm_batch: usize,
    finalize: usize,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, ReconciliationRecord>,
    // scripted status responses; None = a failed fetch
    status_script: VecDeque<Option<ImportStatus>>,
    batch_rejections: HashMap<String, String>,
    breakdown_shape: BreakdownShape,
    lie_in_batch_counters: bool,
    pending_delay: Option<Duration>,
    fail_pending: usize,
    fail_transactions: usize,
    fail_confirmed: usize,
    fail_confirm: usize,
    fail_batch: usize,
    counters: Counters,
}

/// In-memory [`ReconciliationApi`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MemoryApi {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reconciliation with the given statement lines pending;
    /// returns its generated id
    pub fn seed_reconciliation(
        &self,
        bank_id: impl Into<String>,
        month: u32,
        year: i32,
        pending: Vec<ImportedTransaction>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let record = ReconciliationRecord {
            reconciliation: Reconciliation {
                id: id.clone(),
                bank_id: bank_id.into(),
                period: StatementPeriod { month, year },
                status: ReconciliationStatus::Pending,
                summary: None,
            },
            pending,
            confirmed: Vec::new(),
        };
        self.inner.write().unwrap().records.insert(id.clone(), record);
        id
    }

    /// Create a reconciliation whose derived status never leaves processing
    pub fn seed_processing_forever(&self, reconciliation_id: impl Into<String>) {
        let id = reconciliation_id.into();
        let record = ReconciliationRecord {
            reconciliation: Reconciliation {
                id: id.clone(),
                bank_id: "banco-processando".to_string(),
                period: StatementPeriod { month: 1, year: 2024 },
                status: ReconciliationStatus::Processing,
                summary: None,
            },
            pending: Vec::new(),
            confirmed: Vec::new(),
        };
        self.inner.write().unwrap().records.insert(id, record);
    }

    /// Attach a persisted summary to a seeded reconciliation
    pub fn set_persisted_summary(&self, reconciliation_id: &str, summary: FinancialSummary) {
        if let Some(record) = self
            .inner
            .write()
            .unwrap()
            .records
            .get_mut(reconciliation_id)
        {
            record.reconciliation.summary = Some(summary);
        }
    }

    /// Queue a scripted status response
    pub fn push_status(&self, status: ImportStatus) {
        self.inner
            .write()
            .unwrap()
            .status_script
            .push_back(Some(status));
    }

    /// Queue a scripted status-fetch failure
    pub fn push_status_failure(&self) {
        self.inner.write().unwrap().status_script.push_back(None);
    }

    /// Have the batch endpoint reject this transaction with the given detail
    pub fn reject_in_batch(&self, transaction_id: impl Into<String>, detail: impl Into<String>) {
        self.inner
            .write()
            .unwrap()
            .batch_rejections
            .insert(transaction_id.into(), detail.into());
    }

    /// Make the batch response counters claim full success regardless of the
    /// details, to exercise detail-driven interpretation
    pub fn lie_in_batch_counters(&self) {
        self.inner.write().unwrap().lie_in_batch_counters = true;
    }

    pub fn set_breakdown_shape(&self, shape: BreakdownShape) {
        self.inner.write().unwrap().breakdown_shape = shape;
    }

    /// Delay pending fetches, for overlap tests
    pub fn set_pending_delay(&self, delay: Duration) {
        self.inner.write().unwrap().pending_delay = Some(delay);
    }

    /// Fail the next `n` pending fetches
    pub fn fail_pending(&self, n: usize) {
        self.inner.write().unwrap().fail_pending = n;
    }

    /// Fail the next `n` grouped-transactions fetches
    pub fn fail_transactions(&self, n: usize) {
        self.inner.write().unwrap().fail_transactions = n;
    }

    /// Fail the next `n` confirmed-endpoint fetches
    pub fn fail_confirmed(&self, n: usize) {
        self.inner.write().unwrap().fail_confirmed = n;
    }

    /// Fail the next `n` single confirmations at the transport level
    pub fn fail_confirm(&self, n: usize) {
        self.inner.write().unwrap().fail_confirm = n;
    }

    /// Fail the next `n` batch confirmations at the transport level
    pub fn fail_batch(&self, n: usize) {
        self.inner.write().unwrap().fail_batch = n;
    }

    pub fn pending_fetch_calls(&self) -> usize {
        self.inner.read().unwrap().counters.pending_fetch
    }

    pub fn status_fetch_calls(&self) -> usize {
        self.inner.read().unwrap().counters.status_fetch
    }

    pub fn confirmed_fetch_calls(&self) -> usize {
        self.inner.read().unwrap().counters.confirmed_fetch
    }

    pub fn confirm_calls(&self) -> usize {
        self.inner.read().unwrap().counters.confirm
    }

    pub fn confirm_batch_calls(&self) -> usize {
        self.inner.read().unwrap().counters.confirm_batch
    }

    pub fn finalize_calls(&self) -> usize {
        self.inner.read().unwrap().counters.finalize
    }

    /// Server-side view of the confirmed set, for assertions
    pub fn server_confirmed(&self, reconciliation_id: &str) -> Vec<ImportedTransaction> {
        self.inner
            .read()
            .unwrap()
            .records
            .get(reconciliation_id)
            .map(|r| r.confirmed.clone())
            .unwrap_or_default()
    }

    fn take_failure(slot: &mut usize) -> bool {
        if *slot > 0 {
            *slot -= 1;
            true
        } else {
            false
        }
    }

    // Move one transaction from pending to confirmed, wherever it lives.
    // Returns false when no record holds it pending.
    fn apply_confirmation(inner: &mut Inner, transaction_id: &str, account_id: &str) -> bool {
        for record in inner.records.values_mut() {
            if let Some(pos) = record.pending.iter().position(|t| t.id == transaction_id) {
                let mut txn = record.pending.remove(pos);
                txn.confirmed_account_id = Some(account_id.to_string());
                txn.status = Some("confirmada".to_string());
                record.confirmed.push(txn);
                return true;
            }
        }
        false
    }
}

#[async_trait]
impl ReconciliationApi for MemoryApi {
    async fn fetch_reconciliation(
        &self,
        reconciliation_id: &str,
    ) -> ReconcileResult<Reconciliation> {
        let inner = self.inner.read().unwrap();
        inner
            .records
            .get(reconciliation_id)
            .map(|r| r.reconciliation.clone())
            .ok_or_else(|| ReconcileError::NotFound(reconciliation_id.to_string()))
    }

    async fn fetch_pending(
        &self,
        reconciliation_id: &str,
    ) -> ReconcileResult<Vec<ImportedTransaction>> {
        let delay = {
            let mut inner = self.inner.write().unwrap();
            inner.counters.pending_fetch += 1;
            if Self::take_failure(&mut inner.fail_pending) {
                return Err(ReconcileError::Fetch("pendentes indisponiveis".to_string()));
            }
            inner.pending_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.read().unwrap();
        inner
            .records
            .get(reconciliation_id)
            .map(|r| r.pending.clone())
            .ok_or_else(|| ReconcileError::NotFound(reconciliation_id.to_string()))
    }

    async fn fetch_import_status(&self, reconciliation_id: &str) -> ReconcileResult<ImportStatus> {
        let mut inner = self.inner.write().unwrap();
        inner.counters.status_fetch += 1;

        if let Some(scripted) = inner.status_script.pop_front() {
            return scripted
                .ok_or_else(|| ReconcileError::Fetch("status indisponivel".to_string()));
        }

        let record = inner
            .records
            .get(reconciliation_id)
            .ok_or_else(|| ReconcileError::NotFound(reconciliation_id.to_string()))?;

        let status = record.reconciliation.status;
        let mut derived = ImportStatus::of(status);
        derived.progress = if status.is_terminal() { 100 } else { 50 };
        derived.total_transactions = Some((record.pending.len() + record.confirmed.len()) as u32);
        derived.pending_count = Some(record.pending.len() as u32);
        Ok(derived)
    }

    async fn fetch_transactions(
        &self,
        reconciliation_id: &str,
    ) -> ReconcileResult<TransactionBreakdown> {
        let mut inner = self.inner.write().unwrap();
        if Self::take_failure(&mut inner.fail_transactions) {
            return Err(ReconcileError::Fetch("transacoes indisponiveis".to_string()));
        }

        let record = inner
            .records
            .get(reconciliation_id)
            .ok_or_else(|| ReconcileError::NotFound(reconciliation_id.to_string()))?;

        Ok(match inner.breakdown_shape {
            BreakdownShape::Dedicated => TransactionBreakdown {
                all: None,
                pending: Some(record.pending.clone()),
                confirmed: Some(record.confirmed.clone()),
            },
            BreakdownShape::AllWithMarkers => {
                let mut all = record.pending.clone();
                all.extend(record.confirmed.clone());
                TransactionBreakdown {
                    all: Some(all),
                    pending: None,
                    confirmed: None,
                }
            }
            BreakdownShape::NoGroups => TransactionBreakdown::default(),
        })
    }

    async fn fetch_confirmed(
        &self,
        reconciliation_id: &str,
    ) -> ReconcileResult<Vec<ImportedTransaction>> {
        let mut inner = self.inner.write().unwrap();
        inner.counters.confirmed_fetch += 1;
        if Self::take_failure(&mut inner.fail_confirmed) {
            return Err(ReconcileError::Fetch("confirmadas indisponiveis".to_string()));
        }

        inner
            .records
            .get(reconciliation_id)
            .map(|r| r.confirmed.clone())
            .ok_or_else(|| ReconcileError::NotFound(reconciliation_id.to_string()))
    }

    async fn confirm(&self, request: &ConfirmationRequest) -> ReconcileResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.counters.confirm += 1;
        if Self::take_failure(&mut inner.fail_confirm) {
            return Err(ReconcileError::Fetch("falha de rede".to_string()));
        }
        if let Some(detail) = inner.batch_rejections.get(&request.transaction_id).cloned() {
            return Err(ReconcileError::Fetch(detail));
        }

        Self::apply_confirmation(&mut inner, &request.transaction_id, &request.account_id);
        Ok(())
    }

    async fn confirm_batch(
        &self,
        requests: &[ConfirmationRequest],
    ) -> ReconcileResult<BatchOutcome> {
        let mut inner = self.inner.write().unwrap();
        inner.counters.confirm_batch += 1;
        if Self::take_failure(&mut inner.fail_batch) {
            return Err(ReconcileError::Fetch("falha de rede".to_string()));
        }

        let mut details = Vec::with_capacity(requests.len());
        for request in requests {
            if let Some(detail) = inner.batch_rejections.get(&request.transaction_id).cloned() {
                details.push(ConfirmationResult::failed(&request.transaction_id, detail));
                continue;
            }
            Self::apply_confirmation(&mut inner, &request.transaction_id, &request.account_id);
            details.push(ConfirmationResult::ok(&request.transaction_id));
        }

        let mut outcome = BatchOutcome::from_details(details);
        if inner.lie_in_batch_counters {
            outcome.success_count = outcome.details.len();
            outcome.error_count = 0;
        }
        Ok(outcome)
    }

    async fn finalize(&self, reconciliation_id: &str) -> ReconcileResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.counters.finalize += 1;

        let record = inner
            .records
            .get_mut(reconciliation_id)
            .ok_or_else(|| ReconcileError::NotFound(reconciliation_id.to_string()))?;

        if !record.pending.is_empty() {
            return Err(ReconcileError::Validation(
                "reconciliation still has pending transactions".to_string(),
            ));
        }
        if record.reconciliation.status == ReconciliationStatus::Completed {
            return Err(ReconcileError::Validation(
                "reconciliation is already completed".to_string(),
            ));
        }
        record.reconciliation.status = ReconciliationStatus::Completed;
        Ok(())
    }
}
