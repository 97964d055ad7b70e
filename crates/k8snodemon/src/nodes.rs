//! Node enumeration.
//!
//! Produces [`NodeRecord`]s either straight from the compute service or from
//! Kubernetes nodes mapped onto their backing instances. No health filtering
//! happens here; see [`crate::reconcile`].

use std::fmt;

use k8s_openapi::api::core::v1::Node;
use tracing::debug;

use crate::cluster::{ComputeApi, NodeSource};
use crate::error::NodemonError;
use crate::openstack::Server;

/// Provider-ID prefix used by the OpenStack cloud provider.
pub const PROVIDER_ID_PREFIX: &str = "openstack:///";

/// Where node records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationMode {
    /// List compute instances.
    DirectCompute,
    /// List Kubernetes nodes and map them to compute instances.
    ViaOrchestration,
}

impl fmt::Display for EnumerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectCompute => write!(f, "direct-compute"),
            Self::ViaOrchestration => write!(f, "via-orchestration"),
        }
    }
}

/// Health signal, tagged by the vocabulary it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthSignal {
    /// Free-form Nova status.
    Compute(String),
    /// Status of the node's `Ready` condition, `""` when absent.
    Readiness(String),
}

impl HealthSignal {
    /// Raw status value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Compute(s) | Self::Readiness(s) => s,
        }
    }
}

impl fmt::Display for HealthSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one node for a single reconcile pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    /// Human-readable name.
    pub name: String,
    /// Compute instance id.
    pub id: String,
    /// Health signal.
    pub status: HealthSignal,
    /// Source object, for verbose dumps.
    pub raw: serde_json::Value,
}

impl NodeRecord {
    /// Record for a compute instance, taken verbatim.
    pub fn from_server(server: &Server) -> Self {
        Self {
            name: server.name.clone(),
            id: server.id.clone(),
            status: HealthSignal::Compute(server.status.clone()),
            raw: serde_json::to_value(server).unwrap_or_default(),
        }
    }

    /// Record for a Kubernetes node.
    ///
    /// Missing name or provider id become empty strings.
    pub fn from_node(node: &Node) -> Self {
        let provider_id = node
            .spec
            .as_ref()
            .and_then(|spec| spec.provider_id.as_deref())
            .unwrap_or_default();

        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            id: instance_id_from_provider_id(provider_id),
            status: HealthSignal::Readiness(ready_status(node)),
            raw: serde_json::to_value(node).unwrap_or_default(),
        }
    }
}

/// Derive the compute instance id from a node's provider id.
///
/// Removes every occurrence of [`PROVIDER_ID_PREFIX`]. A value without the
/// prefix is returned unchanged.
pub fn instance_id_from_provider_id(provider_id: &str) -> String {
    provider_id.replace(PROVIDER_ID_PREFIX, "")
}

/// Status of the first `Ready` condition, or `""` when there is none.
pub fn ready_status(node: &Node) -> String {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
        .map(|c| c.status.clone())
        .unwrap_or_default()
}

/// List node records for `mode`, in source order.
///
/// `nodes` is required for [`EnumerationMode::ViaOrchestration`] and ignored
/// otherwise.
pub async fn enumerate(
    mode: EnumerationMode,
    compute: &dyn ComputeApi,
    nodes: Option<&dyn NodeSource>,
) -> Result<Vec<NodeRecord>, NodemonError> {
    let records: Vec<NodeRecord> = match mode {
        EnumerationMode::DirectCompute => compute
            .list_servers()
            .await?
            .iter()
            .map(NodeRecord::from_server)
            .collect(),
        EnumerationMode::ViaOrchestration => {
            let source = nodes.ok_or_else(|| {
                NodemonError::Config("orchestration mode needs a Kubernetes client".to_string())
            })?;
            source
                .list_nodes()
                .await?
                .iter()
                .map(NodeRecord::from_node)
                .collect()
        }
    };

    debug!(%mode, count = records.len(), "Enumerated nodes");
    Ok(records)
}
