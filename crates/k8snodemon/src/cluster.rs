//! Seams between the reconcile loop and the cluster APIs.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;

use crate::error::NodemonError;
use crate::openstack::Server;
use crate::reboot::RebootMethod;

/// Authenticated compute service handle.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// List all compute instances, across every page.
    async fn list_servers(&self) -> Result<Vec<Server>, NodemonError>;

    /// Request a reboot of one instance.
    async fn reboot_server(&self, id: &str, method: RebootMethod) -> Result<(), NodemonError>;
}

/// Source of orchestration nodes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// List all cluster nodes.
    async fn list_nodes(&self) -> Result<Vec<Node>, NodemonError>;
}
