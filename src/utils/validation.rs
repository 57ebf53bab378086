//! Validation utilities

use crate::types::{ConfirmationRequest, ReconcileError, ReconcileResult};

/// Validate a single confirmation request before any network call
pub fn validate_confirmation(request: &ConfirmationRequest) -> ReconcileResult<()> {
    if request.transaction_id.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Confirmation requires a transaction id".to_string(),
        ));
    }

    if request.account_id.trim().is_empty() {
        return Err(ReconcileError::Validation(
            "Confirmation requires a selected account".to_string(),
        ));
    }

    Ok(())
}

/// Validate a batch of confirmation requests before any network call
pub fn validate_batch(requests: &[ConfirmationRequest]) -> ReconcileResult<()> {
    if requests.is_empty() {
        return Err(ReconcileError::Validation(
            "Batch confirmation requires at least one request".to_string(),
        ));
    }

    for request in requests {
        validate_confirmation(request)?;
    }

    Ok(())
}
