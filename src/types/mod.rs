mod agent;
mod balance;
mod identifiers;
mod money;
mod usage;
mod wallet;

pub use agent::AgentStatus;
pub use balance::{BalanceCheck, Shortfall};
pub use identifiers::{AgentId, CallId, PaymentReference, UserId};
pub use money::{
    checked_balance, dollars_from_cents, positive_amount, round_money, Pricing, UsageCharge,
    MAX_AMOUNT, MINUTES_SCALE, MONEY_SCALE,
};
pub use usage::{
    start_of_day, start_of_month, DailyUsage, UsageHistory, UsagePeriod, UsageRecord,
    UsageTotals,
};
pub use wallet::{
    CorrelationKey, LedgerEntry, Transaction, TransactionType, Wallet, WalletAudit,
    WalletSeed, WalletSnapshot,
};
