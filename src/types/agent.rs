use serde::{Deserialize, Serialize};

/// Operational status of a voice agent. The balance policy only ever moves
/// agents between `Active` and `PausedNoBalance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Inactive,
    Active,
    Testing,
    Paused,
    PausedNoBalance,
}

impl AgentStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Testing => "testing",
            Self::Paused => "paused",
            Self::PausedNoBalance => "paused_no_balance",
        }
    }

    #[must_use]
    pub const fn is_serving_calls(&self) -> bool {
        matches!(self, Self::Active | Self::Testing)
    }
}

impl TryFrom<&str> for AgentStatus {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, String> {
        match s {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            "testing" => Ok(Self::Testing),
            "paused" => Ok(Self::Paused),
            "paused_no_balance" => Ok(Self::PausedNoBalance),
            _ => Err(format!("Unknown agent status: {s}")),
        }
    }
}

impl std::str::FromStr for AgentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        Self::try_from(s)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
