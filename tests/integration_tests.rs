//! Integration tests for reconciliation-core

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use reconciliation_core::{
    utils::MemoryApi, FinancialSummary, ImportStatus, ImportedTransaction, ReconcileError,
    ReconciliationSession, ReconciliationStatus,
};

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn statement() -> Vec<ImportedTransaction> {
    vec![
        ImportedTransaction::credit("t1", BigDecimal::from(100), "venda cartao", date())
            .with_suggestion("a1"),
        ImportedTransaction::debit("t2", BigDecimal::from(40), "tarifa bancaria", date()),
    ]
}

#[tokio::test]
async fn test_complete_reconciliation_workflow() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    let mut session = ReconciliationSession::new(api.clone(), id.clone());

    let reconciliation = session.refresh_reconciliation().await.unwrap();
    assert_eq!(reconciliation.bank_id, "banco-1");
    assert_eq!(reconciliation.period.month, 3);

    // import already settled; gate opens immediately
    let wait = session.wait_for_import().await;
    assert!(wait.opens_gate());

    assert_eq!(session.load_pending().await.unwrap(), Some(2));

    // no server summary: local recomputation over the pending set
    let summary = session.summary();
    assert_eq!(summary.total_credits, BigDecimal::from(100));
    assert_eq!(summary.total_debits, BigDecimal::from(40));
    assert_eq!(summary.final_balance, BigDecimal::from(60));

    // "confirm all with a suggestion" covers exactly t1
    let outcome = session.confirm_all_suggested().await.unwrap();
    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.details[0].transaction_id, "t1");
    assert_eq!(session.pending().len(), 1);
    assert_eq!(session.confirmed().len(), 1);

    // the operator picks an account for the remaining line
    session.set_assignment("t2", "a9").unwrap();
    let outcome = session.confirm_all_ready().await.unwrap();
    assert!(outcome.is_full_success());
    assert_eq!(session.pending().len(), 0);
    assert_eq!(session.confirmed().len(), 2);

    session.finalize().await.unwrap();
    let reconciliation = session.refresh_reconciliation().await.unwrap();
    assert_eq!(reconciliation.status, ReconciliationStatus::Completed);

    // completed reconciliations are immutable
    let err = session.finalize().await.unwrap_err();
    assert!(matches!(err, ReconcileError::Validation(_)));
}

#[tokio::test]
async fn test_partition_invariant_holds_at_every_step() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    let mut session = ReconciliationSession::new(api, id);
    session.load_pending().await.unwrap();

    let assert_disjoint = |session: &ReconciliationSession<MemoryApi>| {
        let pending = session.pending();
        let confirmed = session.confirmed();
        for txn in &pending {
            assert!(
                confirmed.iter().all(|c| c.id != txn.id),
                "transaction {} in both sets",
                txn.id
            );
        }
        assert_eq!(pending.len() + confirmed.len(), 2);
    };

    session.confirm_one("t1").await.unwrap();
    assert_disjoint(&session);

    session.set_assignment("t2", "a2").unwrap();
    session.confirm_one("t2").await.unwrap();
    assert_disjoint(&session);
}

#[tokio::test]
async fn test_partial_batch_failure_moves_only_acknowledged_items() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    api.reject_in_batch("t2", "conta contabil invalida");
    // counters claim full success; only the details tell the truth
    api.lie_in_batch_counters();

    let mut session = ReconciliationSession::new(api, id);
    session.load_pending().await.unwrap();
    session.set_assignment("t2", "a2").unwrap();

    let outcome = session.confirm_all_ready().await.unwrap();
    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(outcome.failed_ids(), vec!["t2".to_string()]);

    // t1 moved, t2 stayed pending with its assignment intact for retry
    assert_eq!(session.pending().len(), 1);
    assert_eq!(session.pending()[0].id, "t2");
    assert_eq!(session.assignment("t2"), Some("a2"));
    assert_eq!(session.confirmed().len(), 1);
    assert_eq!(session.confirmed()[0].id, "t1");
}

#[tokio::test]
async fn test_batch_network_failure_surfaces_one_error_and_changes_nothing() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    let mut session = ReconciliationSession::new(api.clone(), id.clone());
    session.load_pending().await.unwrap();
    session.set_assignment("t2", "a2").unwrap();
    api.fail_batch(1);

    let err = session.confirm_all_ready().await.unwrap_err();
    assert!(matches!(err, ReconcileError::Fetch(_)));

    assert_eq!(session.pending().len(), 2);
    assert_eq!(session.assignment("t1"), Some("a1"));
    assert_eq!(session.assignment("t2"), Some("a2"));
    assert!(api.server_confirmed(&id).is_empty());
}

#[tokio::test]
async fn test_manual_override_survives_list_refresh() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    let mut session = ReconciliationSession::new(api, id);
    session.load_pending().await.unwrap();
    assert_eq!(session.assignment("t1"), Some("a1"));

    session.set_assignment("t1", "a7").unwrap();

    // refreshing the list re-runs seeding; the override must hold
    session.load_pending().await.unwrap();
    assert_eq!(session.assignment("t1"), Some("a7"));
}

#[tokio::test]
async fn test_server_status_summary_wins_over_local_recomputation() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());

    let mut status = ImportStatus::of(ReconciliationStatus::Pending);
    status.summary = Some(FinancialSummary::new(
        BigDecimal::from(5000),
        BigDecimal::from(1500),
    ));
    api.push_status(status);

    let mut session = ReconciliationSession::new(api, id);
    session.wait_for_import().await;
    session.load_pending().await.unwrap();

    let summary = session.summary();
    assert_eq!(summary.total_credits, BigDecimal::from(5000));
    assert_eq!(summary.final_balance, BigDecimal::from(3500));
    assert!(summary.is_consistent());
}

#[tokio::test]
async fn test_persisted_summary_serves_before_first_load() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    api.set_persisted_summary(
        &id,
        FinancialSummary::new(BigDecimal::from(900), BigDecimal::from(300)),
    );

    let mut session = ReconciliationSession::new(api, id.clone());
    assert_eq!(session.reconciliation_id(), id);
    session.refresh_reconciliation().await.unwrap();

    // nothing fetched yet except the entity itself: the stored summary is
    // the best available figure
    let summary = session.summary();
    assert_eq!(summary.final_balance, BigDecimal::from(600));

    // once the statement loads, the as-imported snapshot outranks it
    session.load_pending().await.unwrap();
    assert_eq!(session.summary().final_balance, BigDecimal::from(60));
}

#[tokio::test]
async fn test_initial_summary_stays_frozen_as_confirmations_land() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    let mut session = ReconciliationSession::new(api, id);
    session.load_pending().await.unwrap();

    let baseline = session.summary();
    assert_eq!(baseline.final_balance, BigDecimal::from(60));

    session.confirm_one("t1").await.unwrap();

    // the as-imported snapshot outranks the shrunken pending set
    let after = session.summary();
    assert_eq!(after, baseline);
}

#[tokio::test]
async fn test_finalize_guard_makes_no_network_call() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    let mut session = ReconciliationSession::new(api.clone(), id);
    session.load_pending().await.unwrap();

    let err = session.finalize().await.unwrap_err();
    assert!(matches!(err, ReconcileError::FinalizeBlocked(2)));
    assert_eq!(api.finalize_calls(), 0);
}

#[tokio::test]
async fn test_single_confirm_failure_keeps_transaction_pending() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, statement());
    let mut session = ReconciliationSession::new(api.clone(), id);
    session.load_pending().await.unwrap();
    api.fail_confirm(1);

    let err = session.confirm_one("t1").await.unwrap_err();
    assert!(matches!(err, ReconcileError::Fetch(_)));
    assert_eq!(session.pending().len(), 2);
    assert_eq!(session.assignment("t1"), Some("a1"));

    // a retry succeeds once the transport recovers
    session.confirm_one("t1").await.unwrap();
    assert_eq!(session.confirmed().len(), 1);
}

#[tokio::test]
async fn test_empty_reconciliation_yields_zero_summary_and_finalizes() {
    let api = Arc::new(MemoryApi::new());
    let id = api.seed_reconciliation("banco-1", 3, 2024, vec![]);
    let mut session = ReconciliationSession::new(api, id);
    session.load_pending().await.unwrap();

    // frozen initial snapshot of an empty statement is the zero summary
    let summary = session.summary();
    assert_eq!(summary, FinancialSummary::zero());

    session.finalize().await.unwrap();
}
