//! Reconciliation workflow components
//!
//! Leaf-first: [`summary`] merges financial snapshots, [`status`] gates on
//! the import job, [`matcher`] tracks account assignments, [`confirm`]
//! commits them, [`store`] owns the pending/confirmed partition, and
//! [`session`] orchestrates the whole workflow.

pub mod confirm;
pub mod matcher;
pub mod session;
pub mod status;
pub mod store;
pub mod summary;

pub use confirm::{ready_requests, suggested_requests, BatchConfirmationEngine};
pub use matcher::TransactionMatcher;
pub use session::ReconciliationSession;
pub use status::{ImportStatusTracker, ImportWait, PollConfig};
pub use store::ReconciliationStateStore;
pub use summary::{resolve_summary, summarize, SummarySources};
