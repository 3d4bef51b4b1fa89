use anyhow::Context as _;
use cashline::{refresh_cash_balance, SyncEngine, SyncOptions};
use cashline_core::SyncConfig;
use cashline_import::{import::create_client, write_ledger, AccountingApi, CsvRuleTable};
use cashline_storage::SqliteLedger;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Ledger database location: the configured path, or `ledger.db` under the
/// platform data directory.
pub fn database_path(config: &SyncConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = &config.database_path {
        return Ok(path.clone());
    }

    let project_dirs = directories::ProjectDirs::from("com", "cashline", "Cashline")
        .context("no home directory to place the ledger in")?;
    let data_dir = project_dirs.data_dir();
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    Ok(data_dir.join("ledger.db"))
}

pub async fn sync(config: &SyncConfig, ledger: &SqliteLedger, skip_balance: bool) -> anyhow::Result<()> {
    let client = create_client(&config.api)?;
    let rules = CsvRuleTable::new(&config.rules_path);

    let report = SyncEngine::new(&client, ledger, &rules, SyncOptions::from(config))
        .run_sync()
        .await;
    tracing::debug!(?report, "sync report");
    match ledger.row_count().await {
        Ok(total) => tracing::info!("ledger now holds {total} rows"),
        Err(e) => tracing::warn!("could not count ledger rows: {e}"),
    }

    if !skip_balance {
        publish_balance(&client, ledger).await;
    }
    Ok(())
}

pub async fn balance(config: &SyncConfig, ledger: &SqliteLedger) -> anyhow::Result<()> {
    let client = create_client(&config.api)?;
    publish_balance(&client, ledger).await;
    Ok(())
}

async fn publish_balance<A: AccountingApi>(api: &A, ledger: &SqliteLedger) {
    if let Err(e) = refresh_cash_balance(api, ledger).await {
        tracing::error!("balance update failed: {e}");
    }
}

pub async fn export(ledger: &SqliteLedger, output: Option<&Path>) -> anyhow::Result<()> {
    let rows = ledger.rows().await?;

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_ledger(file, &rows)?;
            tracing::info!("exported {} ledger rows to {}", rows.len(), path.display());
        }
        None => write_ledger(io::stdout().lock(), &rows)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashline_core::{ClassifiedRow, LedgerStore, Transaction};
    use cashline_storage::create_db;

    #[test]
    fn configured_database_path_wins() {
        let config = SyncConfig {
            database_path: Some(PathBuf::from("/tmp/books/ledger.db")),
            ..SyncConfig::default()
        };
        assert_eq!(database_path(&config).unwrap(), PathBuf::from("/tmp/books/ledger.db"));
    }

    #[tokio::test]
    async fn export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SqliteLedger::new(create_db(&dir.path().join("ledger.db")).await.unwrap());

        let tx = Transaction::from_resource(
            "https://api.example.com/v2/bank_transactions/77",
            chrono::NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            Some("Stripe payout".to_string()),
            "250.00".parse().unwrap(),
            None,
            "https://api.example.com/v2/bank_accounts/1",
        );
        ledger
            .append(&[ClassifiedRow::new(&tx, "Auto: stripe", "Sales")])
            .await
            .unwrap();

        let out = dir.path().join("ledger.csv");
        export(&ledger, Some(&out)).await.unwrap();

        let text = std::fs::read_to_string(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("dated_on,description,amount,category_name,department,transaction_id")
        );
        assert_eq!(lines.next(), Some("2026-03-04,Stripe payout,250.00,Auto: stripe,Sales,77"));
        assert_eq!(lines.next(), None);
    }
}
