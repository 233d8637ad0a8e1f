use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, Result};

fn non_blank(kind: &str, raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(LedgerError::InvalidInput(format!("{kind} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Owner key of a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// # Errors
    /// Returns `InvalidInput` when the identifier is blank.
    pub fn parse(raw: &str) -> Result<Self> {
        non_blank("user id", raw).map(Self)
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = LedgerError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Voice platform call identifier; one usage record per call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CallId(String);

impl CallId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// # Errors
    /// Returns `InvalidInput` when the identifier is blank.
    pub fn parse(raw: &str) -> Result<Self> {
        non_blank("call id", raw).map(Self)
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CallId {
    type Error = LedgerError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<CallId> for String {
    fn from(id: CallId) -> Self {
        id.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment processor reference attached to a top-up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference(String);

impl PaymentReference {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// # Errors
    /// Returns `InvalidInput` when the reference is blank.
    pub fn parse(raw: &str) -> Result<Self> {
        non_blank("payment reference", raw).map(Self)
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = LedgerError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<PaymentReference> for String {
    fn from(id: PaymentReference) -> Self {
        id.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{CallId, PaymentReference, UserId};

    #[test]
    fn parse_trims_and_rejects_blank_identifiers() {
        assert_eq!(
            UserId::parse("  user-1 ").map(|id| id.value().to_string()).ok(),
            Some("user-1".to_string())
        );
        assert!(UserId::parse("   ").is_err());
        assert!(CallId::parse("").is_err());
    }

    #[test]
    fn json_identifiers_are_plain_strings_and_never_blank() {
        assert_eq!(
            serde_json::from_str::<UserId>("\"u1\"").ok(),
            Some(UserId::new("u1"))
        );
        assert_eq!(
            serde_json::to_string(&UserId::new("u1")).ok(),
            Some("\"u1\"".to_string())
        );

        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
        assert!(serde_json::from_str::<CallId>("\"  \"").is_err());
        assert!(serde_json::from_str::<PaymentReference>("\"\"").is_err());
    }
}
