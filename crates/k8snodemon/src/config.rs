//! Per-run settings handed to the reconcile pass.

use crate::nodes::EnumerationMode;
use crate::reboot::RebootMethod;

/// Default scope project.
pub const DEFAULT_PROJECT: &str = "CMS Web";

/// Default `--method` value.
pub const DEFAULT_METHOD: &str = "soft";

/// Settings for one reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Where node records come from.
    pub mode: EnumerationMode,
    /// Reboot method for unhealthy nodes.
    pub method: RebootMethod,
    /// Dump every record to the log.
    pub verbose: bool,
}

impl RunConfig {
    /// Build from the `--k8s`, `--method` and `--verbose` flags.
    pub fn from_flags(k8s: bool, method: &str, verbose: bool) -> Self {
        Self {
            mode: if k8s {
                EnumerationMode::ViaOrchestration
            } else {
                EnumerationMode::DirectCompute
            },
            method: RebootMethod::from_flag(method),
            verbose,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from_flags(false, DEFAULT_METHOD, false)
    }
}
