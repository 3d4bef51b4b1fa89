use cashline_core::{AccountView, BalanceSink, Money, StoreError};
use cashline_import::{AccountingApi, FetchError};

#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("failed to list bank accounts: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to publish cash balance: {0}")]
    Publish(#[from] StoreError),
}

/// Sums the current balance of every active bank account and publishes the
/// total. Accounts reporting no balance count as zero.
pub async fn refresh_cash_balance<A, S>(api: &A, sink: &S) -> Result<Money, BalanceError>
where
    A: AccountingApi,
    S: BalanceSink,
{
    let accounts = api.list_accounts(AccountView::Active).await?;
    let total: Money = accounts.iter().map(|a| a.balance_or_zero()).sum();

    sink.publish(total).await?;
    tracing::info!(accounts = accounts.len(), "cash balance updated: {total}");
    Ok(total)
}
