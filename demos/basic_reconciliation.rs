//! Basic reconciliation workflow example

use reconciliation_core::utils::MemoryApi;
use reconciliation_core::{ImportedTransaction, ReconciliationSession};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Reconciliation Core - Basic Workflow Example\n");

    // Create the in-memory backend and seed an imported statement
    let api = Arc::new(MemoryApi::new());
    let march = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

    let statement = vec![
        ImportedTransaction::credit("txn001", BigDecimal::from(2500), "Venda cartão", march)
            .with_suggestion("conta-receitas"),
        ImportedTransaction::credit("txn002", BigDecimal::from(1200), "Transferência PIX", march)
            .with_suggestion("conta-receitas"),
        ImportedTransaction::debit("txn003", BigDecimal::from(480), "Tarifa bancária", march),
    ];

    let reconciliation_id = api.seed_reconciliation("banco-001", 3, 2024, statement);
    println!("📥 Seeded reconciliation {} for March 2024\n", reconciliation_id);

    let mut session = ReconciliationSession::new(api, reconciliation_id);

    // 1. Wait for the import job to settle
    println!("⏳ Waiting for the import job...");
    let wait = session.wait_for_import().await;
    println!("  ✓ Import settled (gate open: {})\n", wait.opens_gate());

    // 2. Load the pending transactions; suggestions seed the assignments
    println!("📋 Loading pending transactions...");
    let loaded = session.load_pending().await?;
    println!("  ✓ Loaded {} pending transactions", loaded.unwrap_or(0));

    for txn in session.pending() {
        let assigned = session
            .assignment(&txn.id)
            .unwrap_or("<no account selected>");
        println!(
            "    {} | {:?} R${} | {} → {}",
            txn.id, txn.kind, txn.amount, txn.description, assigned
        );
    }
    println!();

    // 3. The financial summary of the statement as imported
    let summary = session.summary();
    println!("💰 Statement Summary:");
    println!("  Total Credits: R${}", summary.total_credits);
    println!("  Total Debits:  R${}", summary.total_debits);
    println!("  Final Balance: R${}\n", summary.final_balance);

    // 4. Confirm everything that came with a suggestion, in one batch
    println!("✅ Confirming all suggested matches...");
    let outcome = session.confirm_all_suggested().await?;
    println!(
        "  ✓ {} confirmed, {} rejected",
        outcome.success_count, outcome.error_count
    );
    println!("  Still pending: {}\n", session.pending().len());

    // 5. The bank fee has no suggestion; assign it manually and confirm
    println!("✍️  Assigning the bank fee manually...");
    session.set_assignment("txn003", "conta-despesas-bancarias")?;
    session.confirm_one("txn003").await?;
    println!("  ✓ txn003 confirmed against conta-despesas-bancarias\n");

    println!("📊 Confirmed transactions:");
    for txn in session.confirmed() {
        println!(
            "    {} | R${} → {}",
            txn.id,
            txn.amount,
            txn.confirmed_account_id.as_deref().unwrap_or("?")
        );
    }
    println!();

    // 6. Nothing pending anymore; finalize the reconciliation
    println!("🔒 Finalizing...");
    session.finalize().await?;
    let reconciliation = session.refresh_reconciliation().await?;
    println!("  ✓ Reconciliation status: {:?}", reconciliation.status);

    println!("\n🎉 Example completed successfully!");
    Ok(())
}
