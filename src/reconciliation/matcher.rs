//! Account assignment tracking for pending transactions

use std::collections::{HashMap, HashSet};

use crate::types::ImportedTransaction;

/// Tracks the operator's current account choice per pending transaction.
///
/// Assignments are seeded at most once per transaction from its persisted
/// suggestion; after that first seed, only manual selection changes them.
/// Refreshing the transaction list never clobbers a manual override with a
/// stale suggestion — the seeded set is explicit state, reset only when the
/// pending set becomes empty (a fresh reconciliation).
#[derive(Debug, Default)]
pub struct TransactionMatcher {
    assignments: HashMap<String, String>,
    seeded: HashSet<String>,
}

impl TransactionMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed assignments from suggestions, once per transaction lifetime.
    ///
    /// Idempotent: a transaction already in the seeded set is skipped even
    /// if its assignment was cleared or manually changed in between.
    pub fn seed_assignments(&mut self, transactions: &[ImportedTransaction]) {
        for txn in transactions {
            if self.seeded.contains(&txn.id) {
                continue;
            }
            if let Some(suggestion) = &txn.suggested_account {
                self.assignments
                    .insert(txn.id.clone(), suggestion.id.clone());
            }
            self.seeded.insert(txn.id.clone());
        }
    }

    /// Manual override, unconditional
    pub fn set_assignment(&mut self, transaction_id: impl Into<String>, account_id: impl Into<String>) {
        self.assignments
            .insert(transaction_id.into(), account_id.into());
    }

    /// Current assignment for a transaction, if any
    pub fn assignment(&self, transaction_id: &str) -> Option<&str> {
        self.assignments.get(transaction_id).map(String::as_str)
    }

    /// Whether a transaction has an assignment (seeded or manual)
    pub fn is_ready(&self, transaction_id: &str) -> bool {
        self.assignments.contains_key(transaction_id)
    }

    /// Number of the given transactions holding a non-empty assignment.
    ///
    /// Drives bulk-action availability and labeling.
    pub fn ready_count(&self, transactions: &[ImportedTransaction]) -> usize {
        transactions
            .iter()
            .filter(|txn| self.is_ready(&txn.id))
            .count()
    }

    /// Drop the assignment of a transaction leaving the pending set
    pub fn clear_assignment(&mut self, transaction_id: &str) {
        self.assignments.remove(transaction_id);
    }

    /// Drop assignments for a batch of transactions leaving the pending set
    pub fn clear_assignments<I, S>(&mut self, transaction_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in transaction_ids {
            self.assignments.remove(id.as_ref());
        }
    }

    /// Forget all assignments and seeding history.
    ///
    /// Call only when the pending set has emptied; mid-session resets would
    /// re-open transactions to re-seeding.
    pub fn reset(&mut self) {
        self.assignments.clear();
        self.seeded.clear();
    }
}
