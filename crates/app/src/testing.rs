//! Scripted accounting API for orchestrator and balance tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use cashline_core::{AccountStatus, AccountView, BankAccount, Transaction};
use cashline_import::{AccountingApi, AuthError, FetchError, PAGE_SIZE};
use chrono::NaiveDate;

pub const BASE: &str = "https://api.example.com/v2";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn account(id: &str, status: AccountStatus, balance: Option<&str>) -> BankAccount {
    BankAccount::new(
        &format!("{BASE}/bank_accounts/{id}"),
        &format!("Account {id}"),
        status,
        balance.map(|b| b.parse().unwrap()),
    )
}

pub fn tx(id: &str, account: &BankAccount, desc: &str, category: Option<&str>) -> Transaction {
    Transaction::from_resource(
        &format!("{BASE}/bank_transactions/{id}"),
        date(2026, 9, 1),
        Some(desc.to_string()),
        "-10.00".parse().unwrap(),
        category.map(str::to_string),
        &account.url,
    )
}

#[derive(Default)]
pub struct MockApi {
    accounts: Vec<BankAccount>,
    transactions: HashMap<String, Vec<Transaction>>,
    fail_accounts: bool,
    fail_pages: HashSet<(String, u32)>,
    page_requests: Mutex<Vec<(String, u32)>>,
    views: Mutex<Vec<AccountView>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: BankAccount, transactions: Vec<Transaction>) -> Self {
        self.transactions.insert(account.url.clone(), transactions);
        self.accounts.push(account);
        self
    }

    pub fn failing_accounts(mut self) -> Self {
        self.fail_accounts = true;
        self
    }

    pub fn failing_page(mut self, account: &BankAccount, page: u32) -> Self {
        self.fail_pages.insert((account.url.clone(), page));
        self
    }

    pub fn page_requests(&self) -> Vec<(String, u32)> {
        self.page_requests.lock().unwrap().clone()
    }

    pub fn views(&self) -> Vec<AccountView> {
        self.views.lock().unwrap().clone()
    }
}

impl AccountingApi for MockApi {
    async fn list_accounts(&self, view: AccountView) -> Result<Vec<BankAccount>, FetchError> {
        self.views.lock().unwrap().push(view);
        if self.fail_accounts {
            return Err(FetchError::Auth(AuthError::Rejected(401)));
        }
        Ok(self
            .accounts
            .iter()
            .filter(|a| view == AccountView::All || a.is_active())
            .cloned()
            .collect())
    }

    async fn transactions_page(
        &self,
        account_url: &str,
        since: NaiveDate,
        page: u32,
    ) -> Result<Vec<Transaction>, FetchError> {
        self.page_requests
            .lock()
            .unwrap()
            .push((account_url.to_string(), page));
        if self.fail_pages.contains(&(account_url.to_string(), page)) {
            return Err(FetchError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        let all: Vec<Transaction> = self
            .transactions
            .get(account_url)
            .map(|txs| txs.iter().filter(|t| t.dated_on >= since).cloned().collect())
            .unwrap_or_default();
        Ok(all
            .into_iter()
            .skip((page as usize - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .collect())
    }
}
