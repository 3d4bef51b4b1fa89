use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;
use super::transaction::resource_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Closed,
}

impl AccountStatus {
    /// Anything the service does not report as `active` is treated as closed.
    pub fn from_api(status: Option<&str>) -> Self {
        match status.map(str::trim) {
            None | Some("") => AccountStatus::Active,
            Some(s) if s.eq_ignore_ascii_case("active") => AccountStatus::Active,
            Some(_) => AccountStatus::Closed,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Which accounts a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountView {
    Active,
    All,
}

impl AccountView {
    pub fn including_closed(include_closed: bool) -> Self {
        if include_closed {
            AccountView::All
        } else {
            AccountView::Active
        }
    }

    pub fn as_query(self) -> &'static str {
        match self {
            AccountView::Active => "active",
            AccountView::All => "all",
        }
    }
}

impl fmt::Display for AccountView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

/// Read-only snapshot of a bank account taken at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: String,
    pub name: String,
    pub status: AccountStatus,
    pub url: String,
    pub current_balance: Option<Money>,
}

impl BankAccount {
    pub fn new(url: &str, name: &str, status: AccountStatus, current_balance: Option<Money>) -> Self {
        BankAccount {
            id: resource_id(url).to_string(),
            name: name.to_string(),
            status,
            url: url.to_string(),
            current_balance,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn balance_or_zero(&self) -> Money {
        self.current_balance.unwrap_or_else(Money::zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_from_api() {
        assert_eq!(AccountStatus::from_api(Some("active")), AccountStatus::Active);
        assert_eq!(AccountStatus::from_api(Some("Active")), AccountStatus::Active);
        assert_eq!(AccountStatus::from_api(None), AccountStatus::Active);
        assert_eq!(AccountStatus::from_api(Some("closed")), AccountStatus::Closed);
        assert_eq!(AccountStatus::from_api(Some("hidden")), AccountStatus::Closed);
    }

    #[test]
    fn view_query_values() {
        assert_eq!(AccountView::including_closed(true).as_query(), "all");
        assert_eq!(AccountView::including_closed(false).as_query(), "active");
    }

    #[test]
    fn account_id_is_trailing_segment() {
        let acc = BankAccount::new(
            "https://api.freeagent.com/v2/bank_accounts/42",
            "Current",
            AccountStatus::Active,
            None,
        );
        assert_eq!(acc.id, "42");
        assert!(acc.is_active());
        assert!(acc.balance_or_zero().is_zero());
    }
}
