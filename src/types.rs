//! Core types and data structures for the reconciliation workflow

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a reconciliation and of its import job.
///
/// Wire values follow the collaborator API (`pendente`, `processando`,
/// `concluida`, `erro`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    /// Import finished, transactions awaiting confirmation
    #[default]
    #[serde(rename = "pendente")]
    Pending,
    /// Import job still running
    #[serde(rename = "processando")]
    Processing,
    /// Reconciliation finalized, nothing pending
    #[serde(rename = "concluida")]
    Completed,
    /// Import job failed
    #[serde(rename = "erro")]
    Failed,
}

impl ReconciliationStatus {
    /// A terminal status is one the import job never leaves on its own.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReconciliationStatus::Processing)
    }
}

/// Direction of an imported statement line.
///
/// The amount carries the magnitude; the sign is implied by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "credito")]
    Credit,
    #[serde(rename = "debito")]
    Debit,
}

/// A previously-persisted candidate account for a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAccount {
    /// Identifier of the suggested ledger account
    pub id: String,
    /// Display name, when the collaborator sends one
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    /// Chart-of-accounts code, when the collaborator sends one
    #[serde(rename = "codigo", default)]
    pub code: Option<String>,
}

impl SuggestedAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            code: None,
        }
    }
}

/// One line of an imported bank statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedTransaction {
    /// Unique identifier within the reconciliation
    pub id: String,
    /// Credit or debit
    #[serde(rename = "tipo")]
    pub kind: TransactionKind,
    /// Non-negative magnitude; unparseable wire values decode as zero
    #[serde(rename = "valor", deserialize_with = "lenient_amount::deserialize")]
    pub amount: BigDecimal,
    /// Statement description line
    #[serde(rename = "descricao")]
    pub description: String,
    /// Date the transaction occurred
    #[serde(rename = "data")]
    pub date: NaiveDate,
    /// Historical account suggestion, when one was persisted
    #[serde(rename = "contaSugerida", default)]
    pub suggested_account: Option<SuggestedAccount>,
    /// Account the transaction was confirmed against, once committed
    #[serde(rename = "contaContabilId", default)]
    pub confirmed_account_id: Option<String>,
    /// Raw collaborator status marker (`confirmada`, `conciliada`, ...)
    #[serde(default)]
    pub status: Option<String>,
}

impl ImportedTransaction {
    /// Create a transaction with the given kind
    pub fn new(
        id: impl Into<String>,
        kind: TransactionKind,
        amount: BigDecimal,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            amount,
            description: description.into(),
            date,
            suggested_account: None,
            confirmed_account_id: None,
            status: None,
        }
    }

    /// Create a credit line
    pub fn credit(
        id: impl Into<String>,
        amount: BigDecimal,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self::new(id, TransactionKind::Credit, amount, description, date)
    }

    /// Create a debit line
    pub fn debit(
        id: impl Into<String>,
        amount: BigDecimal,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self::new(id, TransactionKind::Debit, amount, description, date)
    }

    /// Attach a suggested account
    pub fn with_suggestion(mut self, account_id: impl Into<String>) -> Self {
        self.suggested_account = Some(SuggestedAccount::new(account_id));
        self
    }

    /// Whether the collaborator marked this transaction as already confirmed.
    ///
    /// Used when deriving the confirmed set from an "all transactions"
    /// response: a confirmed account id, or a `confirmada`/`conciliada`
    /// status, both count.
    pub fn has_confirmed_marker(&self) -> bool {
        self.confirmed_account_id.is_some()
            || matches!(
                self.status.as_deref(),
                Some("confirmada") | Some("conciliada")
            )
    }
}

/// Month/year a bank statement covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "ano")]
    pub year: i32,
}

/// One bank-statement-import session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Unique identifier for the reconciliation
    pub id: String,
    /// Owning bank reference
    #[serde(rename = "bancoId")]
    pub bank_id: String,
    /// Statement period
    #[serde(rename = "periodo")]
    pub period: StatementPeriod,
    /// Lifecycle status
    pub status: ReconciliationStatus,
    /// Persisted summary, when the collaborator stored one
    #[serde(rename = "resumo", default)]
    pub summary: Option<FinancialSummary>,
}

/// Canonical financial snapshot of a reconciliation.
///
/// Always satisfies `final_balance == total_credits - total_debits`; use
/// [`FinancialSummary::new`] or [`FinancialSummary::normalized`] rather than
/// building the struct by hand from untrusted figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    #[serde(rename = "totalCreditos")]
    pub total_credits: BigDecimal,
    #[serde(rename = "totalDebitos")]
    pub total_debits: BigDecimal,
    #[serde(rename = "saldoFinal")]
    pub final_balance: BigDecimal,
}

impl FinancialSummary {
    /// Build a summary from credit and debit totals, deriving the balance
    pub fn new(total_credits: BigDecimal, total_debits: BigDecimal) -> Self {
        let final_balance = &total_credits - &total_debits;
        Self {
            total_credits,
            total_debits,
            final_balance,
        }
    }

    /// The all-zero summary
    pub fn zero() -> Self {
        Self::new(BigDecimal::from(0), BigDecimal::from(0))
    }

    /// Re-derive the balance from the totals, discarding whatever the
    /// source reported for it
    pub fn normalized(self) -> Self {
        Self::new(self.total_credits, self.total_debits)
    }

    /// Whether the balance matches the totals exactly
    pub fn is_consistent(&self) -> bool {
        self.final_balance == &self.total_credits - &self.total_debits
    }
}

/// Import-job status as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportStatus {
    pub status: ReconciliationStatus,
    /// Progress percentage, 0-100
    #[serde(rename = "progresso", default)]
    pub progress: u8,
    #[serde(rename = "totalTransacoes", default)]
    pub total_transactions: Option<u32>,
    #[serde(rename = "transacoesPendentes", default)]
    pub pending_count: Option<u32>,
    /// Summary the job attaches once it has seen the whole statement
    #[serde(rename = "resumo", default)]
    pub summary: Option<FinancialSummary>,
    #[serde(rename = "erros", default)]
    pub errors: Vec<String>,
}

impl ImportStatus {
    pub fn of(status: ReconciliationStatus) -> Self {
        Self {
            status,
            progress: 0,
            total_transactions: None,
            pending_count: None,
            summary: None,
            errors: Vec::new(),
        }
    }
}

/// Grouped-transactions response; the collaborator does not guarantee which
/// of these fields are populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionBreakdown {
    #[serde(rename = "todas", default)]
    pub all: Option<Vec<ImportedTransaction>>,
    #[serde(rename = "pendentes", default)]
    pub pending: Option<Vec<ImportedTransaction>>,
    #[serde(rename = "confirmadas", default)]
    pub confirmed: Option<Vec<ImportedTransaction>>,
}

/// One transaction→account commitment submitted to the confirmation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    #[serde(rename = "transacaoId")]
    pub transaction_id: String,
    #[serde(rename = "contaContabilId")]
    pub account_id: String,
    #[serde(rename = "isPrevisao", default)]
    pub is_forecast: bool,
}

impl ConfirmationRequest {
    pub fn new(transaction_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            account_id: account_id.into(),
            is_forecast: false,
        }
    }

    /// Mark the confirmation as a forecast entry
    pub fn forecast(mut self) -> Self {
        self.is_forecast = true;
        self
    }
}

/// Per-request outcome within a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    #[serde(rename = "transacaoId")]
    pub transaction_id: String,
    pub success: bool,
    #[serde(rename = "erro", default)]
    pub error_detail: Option<String>,
}

impl ConfirmationResult {
    pub fn ok(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            success: true,
            error_detail: None,
        }
    }

    pub fn failed(transaction_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            success: false,
            error_detail: Some(detail.into()),
        }
    }
}

/// Aggregate result of a batch confirmation.
///
/// Server-side per-item failures are data, not errors: the caller reports
/// "N confirmed, M failed" and retries only the failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    #[serde(rename = "sucessos")]
    pub success_count: usize,
    #[serde(rename = "erros")]
    pub error_count: usize,
    #[serde(rename = "detalhes")]
    pub details: Vec<ConfirmationResult>,
}

impl BatchOutcome {
    /// Build an outcome from per-item results, deriving the counters.
    ///
    /// Local state transitions are always driven by `details`, never by the
    /// counters alone, so an inconsistent envelope cannot desync the client.
    pub fn from_details(details: Vec<ConfirmationResult>) -> Self {
        let success_count = details.iter().filter(|d| d.success).count();
        let error_count = details.len() - success_count;
        Self {
            success_count,
            error_count,
            details,
        }
    }

    /// Ids the server accepted
    pub fn succeeded_ids(&self) -> Vec<String> {
        self.details
            .iter()
            .filter(|d| d.success)
            .map(|d| d.transaction_id.clone())
            .collect()
    }

    /// Ids the server rejected
    pub fn failed_ids(&self) -> Vec<String> {
        self.details
            .iter()
            .filter(|d| !d.success)
            .map(|d| d.transaction_id.clone())
            .collect()
    }

    pub fn is_full_success(&self) -> bool {
        self.error_count == 0
    }
}

/// Standard collaborator response envelope: `{success, data, message?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the envelope, mapping a failed or empty response to a fetch
    /// error carrying the server message
    pub fn into_result(self) -> ReconcileResult<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(ReconcileError::Fetch(
                self.message
                    .unwrap_or_else(|| "collaborator returned no data".to_string()),
            )),
        }
    }
}

/// Errors that can occur in the reconciliation workflow
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Network or server failure on a read; no local state was changed
    #[error("Fetch error: {0}")]
    Fetch(String),
    /// Rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),
    /// The import job is still running; transaction loading is gated
    #[error("Import job is still processing")]
    ImportRunning,
    /// Finalize refused client-side while pending transactions remain
    #[error("Cannot finalize: {0} pending transaction(s) remain")]
    FinalizeBlocked(usize),
    /// Unknown reconciliation identifier
    #[error("Reconciliation not found: {0}")]
    NotFound(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Lenient decoding for wire amounts: accepts numbers or strings, decodes
/// anything unparseable as zero.
mod lenient_amount {
    use bigdecimal::BigDecimal;
    use serde::{Deserialize, Deserializer};
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawAmount>::deserialize(deserializer)?;
        Ok(match raw {
            Some(RawAmount::Number(n)) => {
                BigDecimal::try_from(n).unwrap_or_else(|_| BigDecimal::from(0))
            }
            Some(RawAmount::Text(s)) => {
                BigDecimal::from_str(s.trim()).unwrap_or_else(|_| BigDecimal::from(0))
            }
            None => BigDecimal::from(0),
        })
    }
}
