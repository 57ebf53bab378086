//! Batch confirmation engine
//!
//! Commits one or many transaction→account assignments against the
//! collaborator. The engine itself never touches local state: it validates,
//! submits, and hands back an interpreted outcome; applying that outcome to
//! the pending/confirmed partition is the session's job, and happens only
//! after the server acknowledged the write.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::traits::ReconciliationApi;
use crate::types::{BatchOutcome, ConfirmationRequest, ImportedTransaction, ReconcileResult};
use crate::utils::validation::{validate_batch, validate_confirmation};

use super::matcher::TransactionMatcher;

/// Submits confirmations to the collaborator.
pub struct BatchConfirmationEngine<A: ReconciliationApi> {
    api: Arc<A>,
}

impl<A: ReconciliationApi> BatchConfirmationEngine<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Commit a single confirmation.
    ///
    /// Fails with a validation error before any network call when the
    /// account is blank.
    pub async fn confirm_one(&self, request: &ConfirmationRequest) -> ReconcileResult<()> {
        validate_confirmation(request)?;
        self.api.confirm(request).await?;
        debug!(
            transaction_id = %request.transaction_id,
            account_id = %request.account_id,
            "confirmation committed"
        );
        Ok(())
    }

    /// Commit a batch of confirmations in exactly one round trip.
    ///
    /// An empty or invalid request list is rejected before the network call.
    /// A transport failure aborts the whole batch. Per-item rejections come
    /// back as data; the outcome counters are re-derived from the per-item
    /// details, so an inconsistent response envelope cannot claim more (or
    /// fewer) successes than its details show.
    pub async fn confirm_batch(
        &self,
        requests: &[ConfirmationRequest],
    ) -> ReconcileResult<BatchOutcome> {
        validate_batch(requests)?;

        let outcome = self.api.confirm_batch(requests).await?;
        let outcome = BatchOutcome::from_details(outcome.details);

        if outcome.error_count > 0 {
            warn!(
                confirmed = outcome.success_count,
                failed = outcome.error_count,
                failed_ids = ?outcome.failed_ids(),
                "batch confirmation partially rejected"
            );
        } else {
            debug!(confirmed = outcome.success_count, "batch confirmation committed");
        }

        Ok(outcome)
    }
}

/// Build requests from every pending transaction carrying a suggestion.
///
/// Pure selection over current state; the "confirm all with a suggestion"
/// workflow affordance.
pub fn suggested_requests(pending: &[ImportedTransaction]) -> Vec<ConfirmationRequest> {
    pending
        .iter()
        .filter_map(|txn| {
            txn.suggested_account
                .as_ref()
                .map(|account| ConfirmationRequest::new(&txn.id, &account.id))
        })
        .collect()
}

/// Build requests from every pending transaction the matcher reports ready.
///
/// Pure selection over current state; the "confirm all with any assignment"
/// workflow affordance. Picks up manual overrides as well as seeds.
pub fn ready_requests(
    pending: &[ImportedTransaction],
    matcher: &TransactionMatcher,
) -> Vec<ConfirmationRequest> {
    pending
        .iter()
        .filter_map(|txn| {
            matcher
                .assignment(&txn.id)
                .map(|account_id| ConfirmationRequest::new(&txn.id, account_id))
        })
        .collect()
}
