//! FreeAgent-style accounting API: bank accounts and paginated bank transactions.
#![allow(async_fn_in_trait)]

use std::time::Duration;

use cashline_core::{AccountStatus, AccountView, ApiConfig, BankAccount, Money, Transaction};
use chrono::NaiveDate;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Records requested per transactions page. A shorter page is the last one.
pub const PAGE_SIZE: usize = 100;

const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no access token available: {0}")]
    Missing(String),
    #[error("access token rejected (HTTP {0})")]
    Rejected(u16),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Transport failures, rate limiting and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Auth(_) | FetchError::Decode(_) | FetchError::InvalidUrl(_) => false,
        }
    }
}

/// Supplies a bearer token on demand.
pub trait CredentialProvider {
    fn bearer_token(&self) -> Result<String, AuthError>;
}

#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        StaticToken(token.into())
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Result<String, AuthError> {
        if self.0.trim().is_empty() {
            return Err(AuthError::Missing("empty token".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// Reads the token from an environment variable on every request, so a
/// refreshed token is picked up without restarting.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        EnvToken { var: var.into() }
    }
}

impl CredentialProvider for EnvToken {
    fn bearer_token(&self) -> Result<String, AuthError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(AuthError::Missing(format!("${} is not set", self.var))),
        }
    }
}

/// Read side of the accounting service used by sync and balance jobs.
pub trait AccountingApi {
    /// One request, no pagination.
    async fn list_accounts(&self, view: AccountView) -> Result<Vec<BankAccount>, FetchError>;

    /// One page (1-based) of an account's transactions dated on or after `since`.
    async fn transactions_page(
        &self,
        account_url: &str,
        since: NaiveDate,
        page: u32,
    ) -> Result<Vec<Transaction>, FetchError>;
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BankAccountsEnvelope {
    bank_accounts: Option<Vec<WireBankAccount>>,
}

#[derive(Debug, Deserialize)]
struct WireBankAccount {
    url: String,
    #[serde(default)]
    name: String,
    status: Option<String>,
    current_balance: Option<Money>,
}

impl WireBankAccount {
    fn into_account(self) -> BankAccount {
        BankAccount::new(
            &self.url,
            &self.name,
            AccountStatus::from_api(self.status.as_deref()),
            self.current_balance,
        )
    }
}

#[derive(Debug, Deserialize)]
struct BankTransactionsEnvelope {
    bank_transactions: Option<Vec<WireBankTransaction>>,
}

#[derive(Debug, Deserialize)]
struct WireBankTransaction {
    url: String,
    dated_on: NaiveDate,
    description: Option<String>,
    amount: Money,
    category_name: Option<String>,
}

impl WireBankTransaction {
    fn into_transaction(self, account_url: &str) -> Transaction {
        Transaction::from_resource(
            &self.url,
            self.dated_on,
            self.description,
            self.amount,
            self.category_name,
            account_url,
        )
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct FreeAgentClient<C> {
    http: reqwest::Client,
    base_url: Url,
    credentials: C,
    max_retries: u32,
    retry_backoff: Duration,
}

impl<C: CredentialProvider> FreeAgentClient<C> {
    pub fn new(config: &ApiConfig, credentials: C) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("cashline/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            credentials,
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        })
    }

    /// `{base}/{resource}`, tolerating a base URL with or without a trailing slash.
    fn endpoint(&self, resource: &str) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(resource);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.get_once(url, query).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self
                        .retry_backoff
                        .saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    tracing::warn!(
                        url = %url,
                        attempt,
                        "request failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let token = self.credentials.bearer_token()?;
        let res = self
            .http
            .get(url.clone())
            .query(query)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Rejected(status.as_u16()).into());
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl<C: CredentialProvider> AccountingApi for FreeAgentClient<C> {
    async fn list_accounts(&self, view: AccountView) -> Result<Vec<BankAccount>, FetchError> {
        let url = self.endpoint("bank_accounts")?;
        let envelope: BankAccountsEnvelope = self
            .get_json(&url, &[("view", view.as_query().to_string())])
            .await?;

        Ok(envelope
            .bank_accounts
            .unwrap_or_default()
            .into_iter()
            .map(WireBankAccount::into_account)
            .collect())
    }

    async fn transactions_page(
        &self,
        account_url: &str,
        since: NaiveDate,
        page: u32,
    ) -> Result<Vec<Transaction>, FetchError> {
        let url = self.endpoint("bank_transactions")?;
        let query = [
            ("bank_account", account_url.to_string()),
            ("from_date", since.format("%Y-%m-%d").to_string()),
            ("page", page.to_string()),
            ("per_page", PAGE_SIZE.to_string()),
        ];
        let envelope: BankTransactionsEnvelope = self.get_json(&url, &query).await?;

        Ok(envelope
            .bank_transactions
            .unwrap_or_default()
            .into_iter()
            .map(|tx| tx.into_transaction(account_url))
            .collect())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
