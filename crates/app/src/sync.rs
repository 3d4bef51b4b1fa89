use cashline_core::{AccountView, ClassifiedRow, LedgerStore, LookbackWindow, SyncConfig, Transaction};
use cashline_import::import::load_rules;
use cashline_import::{AccountingApi, RuleSource, TransactionPages};
use chrono::NaiveDate;

/// Counts reported by one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub accounts: usize,
    pub fetched: usize,
    pub added: usize,
    /// Rows written that were classified by a keyword rule.
    pub auto_classified: usize,
    /// Fetched transactions skipped because their id was already seen.
    pub duplicates: usize,
    pub fetch_errors: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub lookback: LookbackWindow,
    pub max_pages: Option<u32>,
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        SyncOptions {
            lookback: config.lookback(),
            max_pages: config.api.max_pages,
        }
    }
}

/// Fetch → dedup → classify → append, one pass at a time.
///
/// Every failure is logged and contained; a pass always ends with a report.
pub struct SyncEngine<'a, A, L, R: ?Sized> {
    api: &'a A,
    ledger: &'a L,
    rules: &'a R,
    options: SyncOptions,
}

impl<'a, A, L, R> SyncEngine<'a, A, L, R>
where
    A: AccountingApi,
    L: LedgerStore,
    R: RuleSource + ?Sized,
{
    pub fn new(api: &'a A, ledger: &'a L, rules: &'a R, options: SyncOptions) -> Self {
        Self {
            api,
            ledger,
            rules,
            options,
        }
    }

    pub async fn run_sync(&self) -> SyncReport {
        self.run_sync_on(chrono::Local::now().date_naive()).await
    }

    pub async fn run_sync_on(&self, today: NaiveDate) -> SyncReport {
        let window = self.options.lookback;
        tracing::info!("starting sync for {} ({window} lookback)", window.range(today));

        let mut report = SyncReport::default();
        let transactions = self.fetch_all(window.since(today), &mut report).await;
        report.fetched = transactions.len();

        if transactions.is_empty() {
            tracing::info!("sync complete: no transactions found");
            return report;
        }
        tracing::info!("processing {} transactions against mapping rules", transactions.len());

        let rules = match load_rules(self.rules) {
            Ok((rules, rejected)) => {
                for e in &rejected {
                    tracing::warn!("skipping mapping rule: {e}");
                }
                tracing::debug!(
                    keywords = rules.keyword_count(),
                    exact = rules.exact_count(),
                    "mapping rules loaded"
                );
                rules
            }
            Err(e) => {
                tracing::error!("cannot read mapping rules, nothing written: {e}");
                return report;
            }
        };

        let mut seen = match self.ledger.existing_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("cannot read existing ledger ids, nothing written: {e}");
                return report;
            }
        };

        let mut rows = Vec::new();
        let mut auto_classified = 0;
        for tx in &transactions {
            if tx.id.trim().is_empty() {
                tracing::warn!(account = %tx.source_account, "skipping transaction without an id");
                continue;
            }
            if !seen.insert(tx.id.clone()) {
                report.duplicates += 1;
                continue;
            }

            let classification = rules.classify(tx);
            if classification.is_auto() {
                auto_classified += 1;
            }
            rows.push(ClassifiedRow::new(
                tx,
                &classification.category_name,
                &classification.department,
            ));
        }

        if rows.is_empty() {
            tracing::info!("sync complete: transactions downloaded, but they were all duplicates");
            return report;
        }

        match self.ledger.append(&rows).await {
            Ok(()) => {
                report.added = rows.len();
                report.auto_classified = auto_classified;
                tracing::info!(
                    added = report.added,
                    auto_classified = report.auto_classified,
                    duplicates = report.duplicates,
                    "sync complete: ledger updated"
                );
            }
            Err(e) => tracing::error!("failed to append {} ledger rows: {e}", rows.len()),
        }

        report
    }

    /// Every account, every page, strictly one request at a time.
    async fn fetch_all(&self, since: NaiveDate, report: &mut SyncReport) -> Vec<Transaction> {
        let accounts = match self.api.list_accounts(AccountView::All).await {
            Ok(accounts) => accounts,
            Err(e) => {
                report.fetch_errors += 1;
                tracing::error!("could not list bank accounts: {e}");
                return Vec::new();
            }
        };
        report.accounts = accounts.len();
        tracing::info!("found {} bank accounts (active and closed)", accounts.len());

        let mut all = Vec::new();
        for account in &accounts {
            tracing::info!(account = %account.name, "checking account");
            let fetch = TransactionPages::new(self.api, &account.url, since)
                .with_max_pages(self.options.max_pages)
                .collect()
                .await;

            if let Some(e) = &fetch.error {
                report.fetch_errors += 1;
                tracing::warn!(
                    account = %account.name,
                    pages = fetch.pages,
                    "transaction fetch failed, keeping {} records received: {e}",
                    fetch.transactions.len()
                );
            }
            if fetch.truncated {
                tracing::warn!(
                    account = %account.name,
                    pages = fetch.pages,
                    "page limit reached, older transactions not fetched"
                );
            }
            tracing::info!(
                account = %account.name,
                "retrieved {} transactions",
                fetch.transactions.len()
            );
            all.extend(fetch.transactions);
        }
        all
    }
}
