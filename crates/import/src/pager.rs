use cashline_core::Transaction;
use chrono::NaiveDate;

use crate::client::{AccountingApi, FetchError, PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PagerState {
    Open,
    Exhausted,
    Capped,
    Failed,
}

/// Lazily produced transaction pages for one account.
///
/// Pages are requested from 1 upward. An empty page ends the sequence without
/// being yielded; a page shorter than [`PAGE_SIZE`] is yielded and ends it; a
/// full page is yielded and the next one is requested on demand. A failed
/// request is yielded once and ends the sequence.
pub struct TransactionPages<'a, A> {
    api: &'a A,
    account_url: String,
    since: NaiveDate,
    next_page: u32,
    pages_fetched: u32,
    max_pages: Option<u32>,
    state: PagerState,
}

/// Everything one account produced, including a failure part-way through.
#[derive(Debug)]
pub struct TransactionFetch {
    pub transactions: Vec<Transaction>,
    pub pages: u32,
    pub error: Option<FetchError>,
    /// The page cap stopped the sequence before a short or empty page.
    pub truncated: bool,
}

impl TransactionFetch {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && !self.truncated
    }
}

impl<'a, A: AccountingApi> TransactionPages<'a, A> {
    pub fn new(api: &'a A, account_url: &str, since: NaiveDate) -> Self {
        Self {
            api,
            account_url: account_url.to_string(),
            since,
            next_page: 1,
            pages_fetched: 0,
            max_pages: None,
            state: PagerState::Open,
        }
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn is_truncated(&self) -> bool {
        self.state == PagerState::Capped
    }

    /// Rewinds to page 1 so the account can be re-read from the start.
    pub fn restart(&mut self) {
        self.next_page = 1;
        self.pages_fetched = 0;
        self.state = PagerState::Open;
    }

    pub async fn next_page(&mut self) -> Option<Result<Vec<Transaction>, FetchError>> {
        if self.state != PagerState::Open {
            return None;
        }
        if self.max_pages.is_some_and(|max| self.pages_fetched >= max) {
            self.state = PagerState::Capped;
            return None;
        }

        let page = self.next_page;
        let records = match self
            .api
            .transactions_page(&self.account_url, self.since, page)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                self.state = PagerState::Failed;
                return Some(Err(e));
            }
        };
        self.pages_fetched += 1;

        if records.is_empty() {
            self.state = PagerState::Exhausted;
            return None;
        }

        if records.len() < PAGE_SIZE {
            self.state = PagerState::Exhausted;
        } else {
            tracing::debug!(account = %self.account_url, page, "page full, fetching next");
            self.next_page += 1;
        }
        Some(Ok(records))
    }

    /// Drains the remaining pages, keeping whatever arrived before a failure.
    pub async fn collect(mut self) -> TransactionFetch {
        let mut transactions = Vec::new();
        let mut error = None;

        while let Some(page) = self.next_page().await {
            match page {
                Ok(records) => transactions.extend(records),
                Err(e) => error = Some(e),
            }
        }

        TransactionFetch {
            transactions,
            pages: self.pages_fetched,
            error,
            truncated: self.is_truncated(),
        }
    }
}
