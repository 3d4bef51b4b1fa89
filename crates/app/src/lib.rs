pub mod balance;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use balance::{refresh_cash_balance, BalanceError};
pub use sync::{SyncEngine, SyncOptions, SyncReport};
