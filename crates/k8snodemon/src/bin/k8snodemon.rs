//! k8snodemon - reboots unhealthy OpenStack instances backing a cluster.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use k8snodemon::cluster::NodeSource;
use k8snodemon::config::{DEFAULT_METHOD, DEFAULT_PROJECT};
use k8snodemon::{reconcile, ComputeClient, CredentialFlags, KubeNodes, RunConfig};

/// k8snodemon - Kubernetes/OpenStack node management tool.
#[derive(Parser)]
#[command(name = "k8snodemon")]
#[command(about = "Find unhealthy nodes and reboot their OpenStack instances")]
#[command(version)]
struct Cli {
    /// Dump every node record and enable debug logging.
    #[arg(long, default_value = "false")]
    verbose: bool,

    /// Use the OpenStack environment (`OS_*` variables) for authentication.
    #[arg(long, default_value = "false")]
    env: bool,

    /// Use the Kubernetes API to get node information.
    #[arg(long, default_value = "false")]
    k8s: bool,

    /// Keystone token.
    #[arg(long, default_value = "")]
    token: String,

    /// Application credential id (secret goes in --password).
    #[arg(long, default_value = "")]
    appid: String,

    /// User or application name.
    #[arg(long, default_value = "")]
    name: String,

    /// User password or application secret.
    #[arg(long, default_value = "")]
    password: String,

    /// Identity service endpoint.
    #[arg(long, default_value = "")]
    endpoint: String,

    /// Project to scope the token to.
    #[arg(long, default_value = DEFAULT_PROJECT)]
    project: String,

    /// Reboot method: "soft", anything else means hard.
    #[arg(long, default_value = DEFAULT_METHOD)]
    method: String,

    /// Compute region (or set `OS_REGION_NAME` env var).
    #[arg(long, env = "OS_REGION_NAME")]
    region: Option<String>,
}

impl Cli {
    fn credential_flags(&self) -> CredentialFlags {
        CredentialFlags {
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
            appid: self.appid.clone(),
            name: self.name.clone(),
            password: self.password.clone(),
            project: self.project.clone(),
            env: self.env,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(cli).await.inspect_err(|e| {
        error!(error = %format!("{e:#}"), "k8snodemon failed");
    })
}

async fn run(cli: Cli) -> Result<()> {
    let mut credentials = cli.credential_flags();
    if credentials.needs_prompt() {
        credentials.prompt().context("unable to read credentials")?;
    }

    let auth = credentials
        .resolve(|key| std::env::var(key).ok())
        .context("invalid authentication options")?;
    if cli.verbose {
        info!(auth = ?auth, "Auth options");
    }

    let compute = ComputeClient::authenticate(&auth, cli.region.as_deref())
        .await
        .context("compute client error")?;

    let config = RunConfig::from_flags(cli.k8s, &cli.method, cli.verbose);
    info!(mode = %config.mode, method = %config.method, "Starting reconcile pass");

    let kube_nodes = if cli.k8s {
        Some(
            KubeNodes::try_default()
                .await
                .context("failed to create Kubernetes client")?,
        )
    } else {
        None
    };
    let source = kube_nodes.as_ref().map(|n| n as &dyn NodeSource);

    reconcile::run(&config, &compute, source)
        .await
        .context("node enumeration failed")?;

    Ok(())
}
