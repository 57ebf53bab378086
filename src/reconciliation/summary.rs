//! Financial summary aggregation
//!
//! Merges multiple, possibly-absent summary sources into one canonical
//! figure by fixed priority. Higher tiers were computed by the backend over
//! the complete transaction universe; the local recomputation only sees what
//! the client currently holds and is a degraded fallback.

use bigdecimal::BigDecimal;

use crate::types::{FinancialSummary, ImportedTransaction, TransactionKind};

/// Ordered summary sources, highest priority first.
#[derive(Debug, Default)]
pub struct SummarySources<'a> {
    /// Server-reported status summary, authoritative once the import job
    /// attached it
    pub status_summary: Option<&'a FinancialSummary>,
    /// The store's frozen as-imported snapshot
    pub initial_summary: Option<&'a FinancialSummary>,
    /// The reconciliation's own persisted summary field
    pub persisted_summary: Option<&'a FinancialSummary>,
    /// Current pending set, for local recomputation
    pub pending: &'a [ImportedTransaction],
}

/// Recompute a summary from a transaction set.
///
/// Credits and debits are summed by kind; the balance is derived, never
/// read from anywhere.
pub fn summarize(transactions: &[ImportedTransaction]) -> FinancialSummary {
    let mut total_credits = BigDecimal::from(0);
    let mut total_debits = BigDecimal::from(0);

    for txn in transactions {
        match txn.kind {
            TransactionKind::Credit => total_credits += &txn.amount,
            TransactionKind::Debit => total_debits += &txn.amount,
        }
    }

    FinancialSummary::new(total_credits, total_debits)
}

/// Resolve the canonical summary: first present source wins.
///
/// The local recomputation only triggers for a non-empty pending set; an
/// empty pending set with no higher-priority source yields the zero summary.
/// Whatever the source, the returned summary is normalized so the balance
/// invariant holds.
pub fn resolve_summary(sources: SummarySources<'_>) -> FinancialSummary {
    if let Some(summary) = sources.status_summary {
        return summary.clone().normalized();
    }
    if let Some(summary) = sources.initial_summary {
        return summary.clone().normalized();
    }
    if let Some(summary) = sources.persisted_summary {
        return summary.clone().normalized();
    }
    if !sources.pending.is_empty() {
        return summarize(sources.pending);
    }
    FinancialSummary::zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn sample_pending() -> Vec<ImportedTransaction> {
        vec![
            ImportedTransaction::credit("t1", BigDecimal::from(100), "venda", date()),
            ImportedTransaction::debit("t2", BigDecimal::from(40), "tarifa", date()),
        ]
    }

    #[test]
    fn local_recomputation_from_pending() {
        let summary = resolve_summary(SummarySources {
            pending: &sample_pending(),
            ..Default::default()
        });

        assert_eq!(summary.total_credits, BigDecimal::from(100));
        assert_eq!(summary.total_debits, BigDecimal::from(40));
        assert_eq!(summary.final_balance, BigDecimal::from(60));
    }

    #[test]
    fn server_status_summary_beats_local_recomputation() {
        let server = FinancialSummary::new(BigDecimal::from(500), BigDecimal::from(200));
        let pending = sample_pending();

        let summary = resolve_summary(SummarySources {
            status_summary: Some(&server),
            pending: &pending,
            ..Default::default()
        });

        assert_eq!(summary, server);
    }

    #[test]
    fn initial_snapshot_beats_persisted_field() {
        let initial = FinancialSummary::new(BigDecimal::from(300), BigDecimal::from(100));
        let persisted = FinancialSummary::new(BigDecimal::from(1), BigDecimal::from(1));

        let summary = resolve_summary(SummarySources {
            initial_summary: Some(&initial),
            persisted_summary: Some(&persisted),
            ..Default::default()
        });

        assert_eq!(summary, initial);
    }

    #[test]
    fn empty_sources_yield_zero_summary() {
        let summary = resolve_summary(SummarySources::default());
        assert_eq!(summary, FinancialSummary::zero());
    }

    #[test]
    fn crooked_source_is_normalized() {
        let crooked = FinancialSummary {
            total_credits: BigDecimal::from(10),
            total_debits: BigDecimal::from(3),
            final_balance: BigDecimal::from(-1),
        };

        let summary = resolve_summary(SummarySources {
            status_summary: Some(&crooked),
            ..Default::default()
        });

        assert!(summary.is_consistent());
        assert_eq!(summary.final_balance, BigDecimal::from(7));
    }
}
