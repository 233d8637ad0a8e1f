#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod balance_policy;
mod billing;
mod memory_store;
mod payment_events;
mod ports;
mod usage_meter;
mod wallet_ledger;

pub use billing::{
    BillingEvent, BillingOutcome, BillingService, CallCompletion, ManualCredit,
};
pub use memory_store::MemoryLedgerStore;
pub use payment_events::CheckoutWebhookSource;
pub use ports::{
    AgentLifecycleStore, AppendOutcome, LedgerPorts, PaymentConfirmation, PaymentEvent,
    PaymentEventSource, PortFuture, Settlement, SettlementRequest, UsageStore, WalletStore,
};
pub use usage_meter::UsageOutcome;
pub use wallet_ledger::{LedgerReceipt, LedgerRequest};

use crate::config::LedgerSettings;

/// Wallet ledger, usage metering and balance policy over one set of ports.
pub struct LedgerService<P> {
    ports: P,
    settings: LedgerSettings,
}

impl<P> LedgerService<P>
where
    P: LedgerPorts + Sync,
{
    #[must_use]
    pub const fn new(ports: P, settings: LedgerSettings) -> Self {
        Self { ports, settings }
    }

    #[must_use]
    pub const fn ports(&self) -> &P {
        &self.ports
    }

    #[must_use]
    pub const fn settings(&self) -> &LedgerSettings {
        &self.settings
    }
}
