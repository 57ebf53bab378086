//! Collaborator abstraction for the reconciliation workflow
//!
//! The workflow core never talks HTTP directly; everything it needs from the
//! backend goes through [`ReconciliationApi`]. Implement this trait over your
//! transport of choice (an HTTP client in production, [`crate::utils::MemoryApi`]
//! in tests and demos).

use async_trait::async_trait;

use crate::types::*;

/// The REST surface the reconciliation core consumes, in domain terms.
///
/// Envelope handling (`{success, data, message?}`) is the implementor's
/// concern; see [`ApiEnvelope::into_result`]. Methods take `&self` because
/// this models a client, not a mutable store.
#[async_trait]
pub trait ReconciliationApi: Send + Sync {
    /// Fetch the reconciliation entity
    async fn fetch_reconciliation(&self, reconciliation_id: &str)
        -> ReconcileResult<Reconciliation>;

    /// Fetch the transactions still awaiting confirmation
    async fn fetch_pending(
        &self,
        reconciliation_id: &str,
    ) -> ReconcileResult<Vec<ImportedTransaction>>;

    /// Fetch the current import-job status
    async fn fetch_import_status(&self, reconciliation_id: &str) -> ReconcileResult<ImportStatus>;

    /// Fetch the grouped-transactions view.
    ///
    /// The response shape is not guaranteed stable: any of the groups may be
    /// absent. Callers must be prepared to fall back; see the confirmed-view
    /// strategy chain in the state store.
    async fn fetch_transactions(
        &self,
        reconciliation_id: &str,
    ) -> ReconcileResult<TransactionBreakdown>;

    /// Fetch confirmed transactions from the dedicated fallback endpoint
    async fn fetch_confirmed(
        &self,
        reconciliation_id: &str,
    ) -> ReconcileResult<Vec<ImportedTransaction>>;

    /// Commit a single transaction→account confirmation
    async fn confirm(&self, request: &ConfirmationRequest) -> ReconcileResult<()>;

    /// Commit a batch of confirmations in one round trip.
    ///
    /// A transport-level failure is an `Err`; per-item rejections come back
    /// as data inside the [`BatchOutcome`].
    async fn confirm_batch(
        &self,
        requests: &[ConfirmationRequest],
    ) -> ReconcileResult<BatchOutcome>;

    /// Mark the reconciliation as completed
    async fn finalize(&self, reconciliation_id: &str) -> ReconcileResult<()>;
}
