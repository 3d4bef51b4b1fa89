pub mod account;
pub mod config;
pub mod ledger;
pub mod money;
pub mod period;
pub mod transaction;

pub use account::{AccountStatus, AccountView, BankAccount};
pub use config::{ApiConfig, ConfigError, SyncConfig};
pub use ledger::{BalanceSink, LedgerStore, MemoryLedger, StoreError};
pub use money::Money;
pub use period::{DateRange, LookbackWindow};
pub use transaction::{resource_id, ClassifiedRow, Transaction};
