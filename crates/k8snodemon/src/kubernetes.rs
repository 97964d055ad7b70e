//! Kubernetes node listing.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::{debug, info};

use crate::cluster::NodeSource;
use crate::error::NodemonError;

/// Lists nodes through the Kubernetes API.
#[derive(Clone)]
pub struct KubeNodes {
    client: Client,
}

impl KubeNodes {
    /// Connect with the in-cluster configuration, falling back to kubeconfig.
    pub async fn try_default() -> Result<Self, NodemonError> {
        let client = Client::try_default().await?;
        info!("Connected to Kubernetes cluster");
        Ok(Self { client })
    }
}

#[async_trait]
impl NodeSource for KubeNodes {
    async fn list_nodes(&self) -> Result<Vec<Node>, NodemonError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        debug!(count = nodes.items.len(), "Listed Kubernetes nodes");
        Ok(nodes.items)
    }
}
