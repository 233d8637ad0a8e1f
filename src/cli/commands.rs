#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use ledger::{AgentStatus, TransactionType, UsagePeriod};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum CliCommand {
    Help,
    InitDb {
        schema: Option<PathBuf>,
    },
    Wallet {
        user_id: String,
    },
    Credit {
        user_id: String,
        amount: Decimal,
        kind: Option<TransactionType>,
        payment_reference: Option<String>,
        description: Option<String>,
    },
    Debit {
        user_id: String,
        amount: Decimal,
        call_id: Option<String>,
        description: Option<String>,
    },
    RecordUsage {
        user_id: String,
        call_id: String,
        duration_seconds: u64,
    },
    CheckBalance {
        user_id: String,
    },
    Usage {
        user_id: String,
        period: Option<UsagePeriod>,
        limit: Option<u32>,
    },
    Audit {
        user_id: String,
    },
    RegisterAgent {
        agent_id: String,
        user_id: String,
        name: Option<String>,
        status: Option<AgentStatus>,
    },
    ApplyEvent {
        file: PathBuf,
    },
}

impl CliCommand {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::InitDb { .. } => "init-db",
            Self::Wallet { .. } => "wallet",
            Self::Credit { .. } => "credit",
            Self::Debit { .. } => "debit",
            Self::RecordUsage { .. } => "record-usage",
            Self::CheckBalance { .. } => "check-balance",
            Self::Usage { .. } => "usage",
            Self::Audit { .. } => "audit",
            Self::RegisterAgent { .. } => "register-agent",
            Self::ApplyEvent { .. } => "apply-event",
        }
    }
}
