#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

pub mod config;
pub mod db;
pub mod error;
pub mod ledger_service;
pub mod types;

pub use config::{LedgerConfig, LedgerSettings};
pub use db::LedgerDb;
pub use error::{LedgerError, Result};
pub use ledger_service::{BillingService, LedgerService, MemoryLedgerStore};
pub use types::*;
