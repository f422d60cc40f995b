//! Purchased plan tier.
//!
//! The plan is informational only — it shows up in user-facing messages and
//! the admin surface, never in access decisions.

use serde::{Deserialize, Serialize};

/// Plan token as carried in checkout metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Monthly,
    Quarterly,
    Yearly,

    /// Metadata carried a token this build does not know. Kept rather than
    /// rejected so a plan added provider-side does not break reconciliation.
    #[serde(other)]
    Unknown,
}

impl Plan {
    /// Parse a metadata token. Unrecognized tokens map to `Unknown`.
    pub fn parse(token: &str) -> Self {
        match token {
            "monthly" => Plan::Monthly,
            "quarterly" => Plan::Quarterly,
            "yearly" => Plan::Yearly,
            _ => Plan::Unknown,
        }
    }

    /// Stable metadata token for this plan.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Quarterly => "quarterly",
            Plan::Yearly => "yearly",
            Plan::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
