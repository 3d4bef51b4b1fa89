use cashline_core::{BalanceSink, ClassifiedRow, LedgerStore, Money, StoreError};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::HashSet;
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

const CASH_BALANCE_KEY: &str = "cash_balance";
const CASH_BALANCE_UPDATED_KEY: &str = "cash_balance_updated_at";

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// A private in-memory database; the single connection is never recycled.
pub async fn create_in_memory() -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ledger_rows (
            row_no INTEGER PRIMARY KEY AUTOINCREMENT,
            dated_on TEXT NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            category_name TEXT NOT NULL,
            department TEXT NOT NULL,
            transaction_id TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_ledger_rows_transaction_id
            ON ledger_rows (transaction_id)
            WHERE trim(transaction_id) <> ''
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Ledger rows and the cash balance cell in one SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// All rows in append order.
    pub async fn rows(&self) -> Result<Vec<ClassifiedRow>, StoreError> {
        let rows = sqlx::query_as::<_, (i64, String, String, String, String, String, String)>(
            "SELECT row_no, dated_on, description, amount, category_name, department, transaction_id FROM ledger_rows ORDER BY row_no"
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter()
            .map(|r| {
                let dated_on = NaiveDate::parse_from_str(&r.1, "%Y-%m-%d").map_err(|e| {
                    StoreError::Corrupt {
                        row: r.0,
                        reason: format!("dated_on '{}': {e}", r.1),
                    }
                })?;
                let amount = r.3.parse::<Money>().map_err(|e| StoreError::Corrupt {
                    row: r.0,
                    reason: format!("amount '{}': {e}", r.3),
                })?;
                Ok(ClassifiedRow {
                    dated_on,
                    description: r.2,
                    amount,
                    category_name: r.4,
                    department: r.5,
                    transaction_id: r.6,
                })
            })
            .collect()
    }

    pub async fn row_count(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ledger_rows")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)
    }

    /// Last published cash balance, if any.
    pub async fn cash_balance(&self) -> Result<Option<Money>, StoreError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(CASH_BALANCE_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        value
            .map(|v| {
                v.parse::<Money>().map_err(|e| StoreError::Corrupt {
                    row: 0,
                    reason: format!("{CASH_BALANCE_KEY} '{v}': {e}"),
                })
            })
            .transpose()
    }
}

impl LedgerStore for SqliteLedger {
    async fn existing_ids(&self) -> Result<HashSet<String>, StoreError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT transaction_id FROM ledger_rows WHERE trim(transaction_id) <> ''",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(ids.into_iter().collect())
    }

    async fn append(&self, rows: &[ClassifiedRow]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;
        for row in rows {
            sqlx::query(
                "INSERT INTO ledger_rows (dated_on, description, amount, category_name, department, transaction_id) VALUES (?, ?, ?, ?, ?, ?)"
            )
            .bind(row.dated_on.format("%Y-%m-%d").to_string())
            .bind(&row.description)
            .bind(row.amount.amount().to_string())
            .bind(&row.category_name)
            .bind(&row.department)
            .bind(&row.transaction_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        }
        tx.commit().await.map_err(StoreError::backend)?;

        tracing::debug!(rows = rows.len(), "appended ledger rows");
        Ok(())
    }
}

impl BalanceSink for SqliteLedger {
    async fn publish(&self, total: Money) -> Result<(), StoreError> {
        let upsert = "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value";

        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;
        sqlx::query(upsert)
            .bind(CASH_BALANCE_KEY)
            .bind(total.amount().to_string())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        sqlx::query(upsert)
            .bind(CASH_BALANCE_UPDATED_KEY)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, desc: &str, amount: &str) -> ClassifiedRow {
        ClassifiedRow {
            dated_on: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            description: desc.to_string(),
            amount: amount.parse().unwrap(),
            category_name: "Uncategorised".to_string(),
            department: "General Administrative".to_string(),
            transaction_id: id.to_string(),
        }
    }

    async fn ledger() -> SqliteLedger {
        SqliteLedger::new(create_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn empty_ledger_has_no_ids() {
        let ledger = ledger().await;
        assert!(ledger.existing_ids().await.unwrap().is_empty());
        assert_eq!(ledger.row_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn append_then_read_back_in_order() {
        let ledger = ledger().await;
        ledger
            .append(&[row("10", "first", "-1.50"), row("7", "second", "200")])
            .await
            .unwrap();
        ledger.append(&[row("3", "third", "0.99")]).await.unwrap();

        let rows = ledger.rows().await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["10", "7", "3"]);
        assert_eq!(rows[0].amount, "-1.50".parse().unwrap());
        assert_eq!(rows[1].description, "second");

        let existing = ledger.existing_ids().await.unwrap();
        assert_eq!(existing.len(), 3);
        assert!(existing.contains("7"));
    }

    #[tokio::test]
    async fn append_empty_is_noop() {
        let ledger = ledger().await;
        ledger.append(&[]).await.unwrap();
        assert_eq!(ledger.row_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_id_rejects_whole_batch() {
        let ledger = ledger().await;
        ledger.append(&[row("1", "a", "1")]).await.unwrap();

        let result = ledger.append(&[row("2", "b", "1"), row("1", "dup", "1")]).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));

        let rows = ledger.rows().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "a");
    }

    #[tokio::test]
    async fn blank_ids_are_ignored_by_existing_ids() {
        let ledger = ledger().await;
        ledger.append(&[row("", "manual entry", "5")]).await.unwrap();
        assert!(ledger.existing_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitespace_ids_are_neither_unique_nor_existing() {
        let ledger = ledger().await;
        ledger
            .append(&[row(" ", "manual a", "1"), row("  ", "manual b", "2")])
            .await
            .unwrap();
        ledger.append(&[row(" ", "manual c", "3")]).await.unwrap();

        assert_eq!(ledger.row_count().await.unwrap(), 3);
        assert!(ledger.existing_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_replaces_cash_balance() {
        let ledger = ledger().await;
        assert_eq!(ledger.cash_balance().await.unwrap(), None);

        ledger.publish("90.50".parse().unwrap()).await.unwrap();
        ledger.publish("-12.00".parse().unwrap()).await.unwrap();
        assert_eq!(ledger.cash_balance().await.unwrap(), Some("-12.00".parse().unwrap()));
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        {
            let ledger = SqliteLedger::new(create_db(&path).await.unwrap());
            ledger.append(&[row("42", "kept", "3.00")]).await.unwrap();
            ledger.pool().close().await;
        }

        let reopened = SqliteLedger::new(create_db(&path).await.unwrap());
        let ids = reopened.existing_ids().await.unwrap();
        assert!(ids.contains("42"));
        assert_eq!(reopened.rows().await.unwrap()[0].description, "kept");
    }
}
