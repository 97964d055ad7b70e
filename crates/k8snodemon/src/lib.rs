//! Node health reconciliation for OpenStack and Kubernetes.
//!
//! One pass authenticates against OpenStack, enumerates nodes (compute
//! instances, or Kubernetes nodes mapped to their instances), and issues a
//! reboot for every node that is not healthy.
//!
//! # Example
//!
//! ```rust,ignore
//! use k8snodemon::{reconcile, ComputeClient, CredentialFlags, RunConfig};
//!
//! let auth = flags.resolve(|key| std::env::var(key).ok())?;
//! let compute = ComputeClient::authenticate(&auth, None).await?;
//! let report = reconcile::run(&RunConfig::default(), &compute, None).await?;
//! ```

pub mod cluster;
pub mod config;
pub mod credentials;
pub mod error;
pub mod kubernetes;
pub mod nodes;
pub mod openstack;
pub mod reboot;
pub mod reconcile;

pub use cluster::{ComputeApi, NodeSource};
pub use config::RunConfig;
pub use credentials::{AuthOptions, CredentialFlags};
pub use error::NodemonError;
pub use kubernetes::KubeNodes;
pub use nodes::{EnumerationMode, HealthSignal, NodeRecord};
pub use openstack::ComputeClient;
pub use reboot::{RebootMethod, RebootOutcome, RebootResult};
pub use reconcile::ReconcileReport;
