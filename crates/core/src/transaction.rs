use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// Returns the final path segment of a resource URL, ignoring a trailing `/`.
///
/// `https://api.freeagent.com/v2/bank_transactions/123` → `123`.
pub fn resource_id(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

/// A bank transaction as fetched from the accounting service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Dedup key, derived from the transaction's resource URL.
    pub id: String,
    pub dated_on: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub category_name: Option<String>,
    /// URL of the bank account the transaction was listed under.
    pub source_account: String,
}

impl Transaction {
    pub fn from_resource(
        url: &str,
        dated_on: NaiveDate,
        description: Option<String>,
        amount: Money,
        category_name: Option<String>,
        source_account: &str,
    ) -> Self {
        Transaction {
            id: resource_id(url).to_string(),
            dated_on,
            description: description.unwrap_or_default(),
            amount,
            category_name,
            source_account: source_account.to_string(),
        }
    }
}

/// A classified ledger row. Once written it is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRow {
    pub dated_on: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub category_name: String,
    pub department: String,
    pub transaction_id: String,
}

impl ClassifiedRow {
    pub fn new(tx: &Transaction, category_name: &str, department: &str) -> Self {
        ClassifiedRow {
            dated_on: tx.dated_on,
            description: tx.description.clone(),
            amount: tx.amount,
            category_name: category_name.to_string(),
            department: department.to_string(),
            transaction_id: tx.id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn resource_id_takes_last_segment() {
        assert_eq!(resource_id("https://api.example.com/v2/bank_transactions/987"), "987");
        assert_eq!(resource_id("https://api.example.com/v2/bank_transactions/987/"), "987");
        assert_eq!(resource_id("987"), "987");
        assert_eq!(resource_id(""), "");
    }

    #[test]
    fn from_resource_defaults_missing_description() {
        let tx = Transaction::from_resource(
            "https://api.example.com/v2/bank_transactions/5",
            date(2024, 3, 1),
            None,
            "12.00".parse().unwrap(),
            None,
            "https://api.example.com/v2/bank_accounts/1",
        );
        assert_eq!(tx.id, "5");
        assert_eq!(tx.description, "");
    }

    #[test]
    fn classified_row_copies_transaction_fields() {
        let tx = Transaction::from_resource(
            "https://api.example.com/v2/bank_transactions/77",
            date(2024, 3, 1),
            Some("AWS EMEA".to_string()),
            "-15.20".parse().unwrap(),
            Some("Computer Software".to_string()),
            "https://api.example.com/v2/bank_accounts/1",
        );
        let row = ClassifiedRow::new(&tx, "Auto: aws", "Engineering");
        assert_eq!(row.transaction_id, "77");
        assert_eq!(row.dated_on, date(2024, 3, 1));
        assert_eq!(row.description, "AWS EMEA");
        assert_eq!(row.amount, tx.amount);
        assert_eq!(row.category_name, "Auto: aws");
        assert_eq!(row.department, "Engineering");
    }
}
