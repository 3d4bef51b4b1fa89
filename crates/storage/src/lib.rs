pub mod db;

pub use db::{create_db, create_in_memory, DbPool, SqliteLedger};
