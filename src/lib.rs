//! # Reconciliation Core
//!
//! A bank-statement reconciliation engine: it reconciles imported statement
//! transactions against a chart of accounts, proposing an account match per
//! transaction, letting an operator accept or override it, and committing
//! confirmations individually or in batch — all while an asynchronous import
//! job may still be populating the transaction set.
//!
//! ## Features
//!
//! - **Import tracking**: bounded, cancellable polling of the import job;
//!   nothing loads while the job is still processing
//! - **Assignment matching**: suggestions seed assignments exactly once;
//!   manual overrides are never clobbered by stale suggestions
//! - **Batch confirmation**: one round trip per batch, per-item outcomes,
//!   failed items stay pending with their assignments intact
//! - **State partition**: every transaction is pending or confirmed, never
//!   both; local state mutates only after server acknowledgment
//! - **Summary aggregation**: one canonical financial snapshot resolved by
//!   fixed source priority, always internally consistent
//! - **Collaborator abstraction**: backend reached only through the
//!   [`ReconciliationApi`] trait; an in-memory implementation ships for
//!   tests and development
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::{ReconciliationSession, utils::MemoryApi};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let api = Arc::new(MemoryApi::new());
//! let id = api.seed_reconciliation("banco-1", 3, 2024, vec![]);
//!
//! let mut session = ReconciliationSession::new(api, id);
//! session.wait_for_import().await;
//! session.load_pending().await.unwrap();
//! # }
//! ```

pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
