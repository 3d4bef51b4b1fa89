//! Storage seams for the classified ledger and the cash balance cell.
#![allow(async_fn_in_trait)]

use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

use super::money::Money;
use super::transaction::ClassifiedRow;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("corrupt ledger row {row}: {reason}")]
    Corrupt { row: i64, reason: String },
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }
}

/// Append-only store of classified rows.
pub trait LedgerStore {
    /// Every non-blank transaction id already present.
    async fn existing_ids(&self) -> Result<HashSet<String>, StoreError>;

    /// Writes `rows` after the last existing row, in order. Empty input is a no-op.
    async fn append(&self, rows: &[ClassifiedRow]) -> Result<(), StoreError>;
}

/// Destination for the aggregated cash balance.
pub trait BalanceSink {
    async fn publish(&self, total: Money) -> Result<(), StoreError>;
}

/// Ledger and balance cell kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<ClassifiedRow>>,
    balance: Mutex<Option<Money>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<ClassifiedRow>) -> Self {
        MemoryLedger {
            rows: Mutex::new(rows),
            balance: Mutex::new(None),
        }
    }

    pub fn rows(&self) -> Vec<ClassifiedRow> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn balance(&self) -> Option<Money> {
        self.balance.lock().map(|b| *b).unwrap_or_default()
    }
}

#[derive(Debug, Error)]
#[error("in-memory ledger lock poisoned")]
struct PoisonedLock;

impl LedgerStore for MemoryLedger {
    async fn existing_ids(&self) -> Result<HashSet<String>, StoreError> {
        let rows = self.rows.lock().map_err(|_| StoreError::backend(PoisonedLock))?;
        Ok(rows
            .iter()
            .filter(|r| !r.transaction_id.trim().is_empty())
            .map(|r| r.transaction_id.clone())
            .collect())
    }

    async fn append(&self, new_rows: &[ClassifiedRow]) -> Result<(), StoreError> {
        if new_rows.is_empty() {
            return Ok(());
        }
        let mut rows = self.rows.lock().map_err(|_| StoreError::backend(PoisonedLock))?;
        rows.extend_from_slice(new_rows);
        Ok(())
    }
}

impl BalanceSink for MemoryLedger {
    async fn publish(&self, total: Money) -> Result<(), StoreError> {
        let mut balance = self.balance.lock().map_err(|_| StoreError::backend(PoisonedLock))?;
        *balance = Some(total);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(id: &str) -> ClassifiedRow {
        ClassifiedRow {
            dated_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            description: format!("tx {id}"),
            amount: "10.00".parse().unwrap(),
            category_name: "Uncategorised".to_string(),
            department: "General Administrative".to_string(),
            transaction_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_ledger_has_no_ids() {
        let ledger = MemoryLedger::new();
        assert!(ledger.existing_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_preserves_existing_rows_and_order() {
        let ledger = MemoryLedger::with_rows(vec![row("1")]);
        ledger.append(&[row("3"), row("2")]).await.unwrap();
        let ids: Vec<_> = ledger.rows().into_iter().map(|r| r.transaction_id).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
    }

    #[tokio::test]
    async fn blank_ids_are_not_reported() {
        let ledger = MemoryLedger::with_rows(vec![row("1"), row(" ")]);
        let ids = ledger.existing_ids().await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("1"));
    }

    #[tokio::test]
    async fn publish_overwrites_balance() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.balance(), None);
        ledger.publish("5.00".parse().unwrap()).await.unwrap();
        ledger.publish("7.25".parse().unwrap()).await.unwrap();
        assert_eq!(ledger.balance(), Some("7.25".parse().unwrap()));
    }
}
