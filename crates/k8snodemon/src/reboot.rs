//! Reboot action executor.

use std::fmt;

use tracing::{error, info};

use crate::cluster::ComputeApi;
use crate::nodes::NodeRecord;

/// How to restart an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootMethod {
    /// Graceful reboot through the guest OS.
    Soft,
    /// Power-cycle the instance.
    Hard,
}

impl RebootMethod {
    /// Parse the `--method` flag.
    ///
    /// Only the exact string `"soft"` selects a soft reboot. Every other
    /// value, including the empty string, selects a hard reboot.
    pub fn from_flag(flag: &str) -> Self {
        if flag == "soft" {
            Self::Soft
        } else {
            Self::Hard
        }
    }

    /// Value of the Nova reboot `type` field.
    pub fn nova_type(self) -> &'static str {
        match self {
            Self::Soft => "SOFT",
            Self::Hard => "HARD",
        }
    }
}

impl fmt::Display for RebootMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soft => write!(f, "soft"),
            Self::Hard => write!(f, "hard"),
        }
    }
}

/// Result of one reboot request as reported by the compute service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebootResult {
    /// Request accepted.
    Accepted,
    /// Request failed with the given message.
    Failed(String),
}

/// Reboot request issued for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootOutcome {
    /// Instance id the request targeted.
    pub id: String,
    /// Node name.
    pub name: String,
    /// Method used.
    pub method: RebootMethod,
    /// What the compute service answered.
    pub result: RebootResult,
}

impl RebootOutcome {
    /// Whether the compute service accepted the request.
    pub fn is_accepted(&self) -> bool {
        self.result == RebootResult::Accepted
    }
}

/// Issue exactly one reboot request for `node` and record the answer.
///
/// Failures are logged and returned in the outcome, never propagated.
pub async fn execute(
    compute: &dyn ComputeApi,
    node: &NodeRecord,
    method: RebootMethod,
) -> RebootOutcome {
    let result = match compute.reboot_server(&node.id, method).await {
        Ok(()) => {
            info!(id = %node.id, name = %node.name, %method, "Reboot request accepted");
            RebootResult::Accepted
        }
        Err(e) => {
            error!(id = %node.id, name = %node.name, %method, error = %e, "Reboot request failed");
            RebootResult::Failed(e.to_string())
        }
    };

    RebootOutcome {
        id: node.id.clone(),
        name: node.name.clone(),
        method,
        result,
    }
}
