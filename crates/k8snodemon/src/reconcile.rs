//! Health policy and the single reconcile pass.

use tracing::{info, warn};

use crate::cluster::{ComputeApi, NodeSource};
use crate::config::RunConfig;
use crate::error::NodemonError;
use crate::nodes::{self, HealthSignal, NodeRecord};
use crate::reboot::{self, RebootOutcome};

/// Whether a record must be rebooted.
///
/// Compute status is healthy only when it equals "active" ignoring case.
/// Readiness is healthy only when it is exactly "True"; anything else,
/// including an absent condition, needs a reboot.
pub fn needs_reboot(record: &NodeRecord) -> bool {
    match &record.status {
        HealthSignal::Compute(status) => status.to_lowercase() != "active",
        HealthSignal::Readiness(status) => status != "True",
    }
}

/// Summary of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records looked at.
    pub inspected: usize,
    /// Records left alone.
    pub healthy: usize,
    /// One entry per reboot request, in enumeration order.
    pub reboots: Vec<RebootOutcome>,
}

impl ReconcileReport {
    /// Reboot requests the compute service rejected.
    pub fn failed(&self) -> usize {
        self.reboots.iter().filter(|o| !o.is_accepted()).count()
    }
}

/// Reboot every unhealthy record, one at a time.
pub async fn reconcile(
    records: &[NodeRecord],
    compute: &dyn ComputeApi,
    config: &RunConfig,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for record in records {
        report.inspected += 1;
        info!(id = %record.id, name = %record.name, status = %record.status, "Inspecting node");
        if config.verbose {
            info!(id = %record.id, record = %record.raw, "Node record");
        }

        if !needs_reboot(record) {
            report.healthy += 1;
            continue;
        }

        warn!(
            name = %record.name,
            id = %record.id,
            status = %record.status,
            method = %config.method,
            "Found unhealthy node, applying reboot"
        );
        report
            .reboots
            .push(reboot::execute(compute, record, config.method).await);
    }

    report
}

/// Enumerate nodes and reconcile them.
///
/// Enumeration failures are returned before any reboot is issued.
pub async fn run(
    config: &RunConfig,
    compute: &dyn ComputeApi,
    nodes: Option<&dyn NodeSource>,
) -> Result<ReconcileReport, NodemonError> {
    let records = nodes::enumerate(config.mode, compute, nodes).await?;
    let report = reconcile(&records, compute, config).await;

    info!(
        mode = %config.mode,
        inspected = report.inspected,
        healthy = report.healthy,
        rebooted = report.reboots.len(),
        failed = report.failed(),
        "Reconcile pass complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{MockComputeApi, MockNodeSource};
    use crate::nodes::EnumerationMode;
    use crate::openstack::Server;
    use crate::reboot::{RebootMethod, RebootResult};
    use k8s_openapi::api::core::v1::{Node, NodeSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (buffer, guard)
    }

    fn compute_record(status: &str) -> NodeRecord {
        NodeRecord {
            name: "vm".to_string(),
            id: "id".to_string(),
            status: HealthSignal::Compute(status.to_string()),
            raw: serde_json::Value::Null,
        }
    }

    fn readiness_record(status: &str) -> NodeRecord {
        NodeRecord {
            status: HealthSignal::Readiness(status.to_string()),
            ..compute_record("")
        }
    }

    fn server(id: &str, status: &str) -> Server {
        Server {
            id: id.to_string(),
            name: format!("vm-{id}"),
            status: status.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_compute_status_is_case_insensitive() {
        for status in ["ACTIVE", "active", "Active"] {
            assert!(!needs_reboot(&compute_record(status)), "{status}");
        }
        for status in ["ERROR", "SHUTOFF", "BUILD", "building", "", "True"] {
            assert!(needs_reboot(&compute_record(status)), "{status}");
        }
    }

    #[test]
    fn test_readiness_status_is_case_sensitive() {
        assert!(!needs_reboot(&readiness_record("True")));
        for status in ["true", "TRUE", "False", "Unknown", "", "ACTIVE"] {
            assert!(needs_reboot(&readiness_record(status)), "{status}");
        }
    }

    #[tokio::test]
    async fn test_every_record_is_logged_without_verbose() {
        let (logs, _guard) = capture_logs();
        let compute = MockComputeApi::new();
        let records = vec![NodeRecord {
            name: "worker-ready".to_string(),
            id: "ready-id".to_string(),
            ..readiness_record("True")
        }];

        let report = reconcile(&records, &compute, &RunConfig::default()).await;
        assert_eq!(report.healthy, 1);

        let output = logs.contents();
        assert!(output.contains("Inspecting node"), "{output}");
        assert!(output.contains("worker-ready"), "{output}");
        assert!(output.contains("ready-id"), "{output}");
        assert!(!output.contains("Node record"), "{output}");
    }

    #[tokio::test]
    async fn test_verbose_dumps_raw_record() {
        let (logs, _guard) = capture_logs();
        let compute = MockComputeApi::new();
        let records = vec![NodeRecord {
            raw: serde_json::json!({"flavor": "m1.large"}),
            ..compute_record("ACTIVE")
        }];
        let config = RunConfig::from_flags(false, "soft", true);

        reconcile(&records, &compute, &config).await;

        let output = logs.contents();
        assert!(output.contains("Node record"), "{output}");
        assert!(output.contains("m1.large"), "{output}");
    }

    #[tokio::test]
    async fn test_active_instance_is_left_alone() {
        let mut compute = MockComputeApi::new();
        compute
            .expect_list_servers()
            .returning(|| Ok(vec![server("abc-123", "ACTIVE")]));
        compute.expect_reboot_server().never();

        let report = run(&RunConfig::default(), &compute, None).await.unwrap();
        assert_eq!(report.inspected, 1);
        assert_eq!(report.healthy, 1);
        assert!(report.reboots.is_empty());
    }

    #[tokio::test]
    async fn test_error_instance_gets_default_soft_reboot() {
        let mut compute = MockComputeApi::new();
        compute
            .expect_list_servers()
            .returning(|| Ok(vec![server("abc-123", "ERROR")]));
        compute
            .expect_reboot_server()
            .withf(|id, method| id == "abc-123" && *method == RebootMethod::Soft)
            .times(1)
            .returning(|_, _| Ok(()));

        let report = run(&RunConfig::default(), &compute, None).await.unwrap();
        assert_eq!(report.reboots.len(), 1);
        assert_eq!(report.reboots[0].method, RebootMethod::Soft);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_node_without_ready_condition_is_rebooted_by_instance_id() {
        let mut compute = MockComputeApi::new();
        compute.expect_list_servers().never();
        compute
            .expect_reboot_server()
            .withf(|id, _| id == "abc-123")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut source = MockNodeSource::new();
        source.expect_list_nodes().returning(|| {
            Ok(vec![Node {
                metadata: ObjectMeta {
                    name: Some("worker-0".to_string()),
                    ..ObjectMeta::default()
                },
                spec: Some(NodeSpec {
                    provider_id: Some("openstack:///abc-123".to_string()),
                    ..NodeSpec::default()
                }),
                status: None,
            }])
        });

        let config = RunConfig::from_flags(true, "soft", false);
        let report = run(&config, &compute, Some(&source)).await.unwrap();
        assert_eq!(report.reboots.len(), 1);
        assert_eq!(report.reboots[0].id, "abc-123");
        assert_eq!(report.reboots[0].name, "worker-0");
    }

    #[tokio::test]
    async fn test_only_unhealthy_node_is_rebooted() {
        let mut compute = MockComputeApi::new();
        compute.expect_list_servers().returning(|| {
            Ok(vec![
                server("healthy-1", "ACTIVE"),
                server("broken-2", "SHUTOFF"),
            ])
        });
        compute
            .expect_reboot_server()
            .withf(|id, method| id == "broken-2" && *method == RebootMethod::Hard)
            .times(1)
            .returning(|_, _| Ok(()));

        let config = RunConfig::from_flags(false, "hard", false);
        let report = run(&config, &compute, None).await.unwrap();
        assert_eq!(report.inspected, 2);
        assert_eq!(report.healthy, 1);
        assert_eq!(report.reboots.len(), 1);
        assert_eq!(report.reboots[0].id, "broken-2");
    }

    #[tokio::test]
    async fn test_failed_reboot_does_not_stop_the_pass() {
        let mut compute = MockComputeApi::new();
        let mut seq = mockall::Sequence::new();
        compute
            .expect_reboot_server()
            .withf(|id, _| id == "first")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(NodemonError::Api {
                    status: 404,
                    message: "Instance could not be found".to_string(),
                })
            });
        compute
            .expect_reboot_server()
            .withf(|id, _| id == "second")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let records = vec![
            NodeRecord {
                id: "first".to_string(),
                ..compute_record("ERROR")
            },
            NodeRecord {
                id: "second".to_string(),
                ..compute_record("ERROR")
            },
        ];
        let report = reconcile(&records, &compute, &RunConfig::default()).await;

        assert_eq!(report.reboots.len(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(report.reboots[0].result, RebootResult::Failed(_)));
        assert_eq!(report.reboots[1].result, RebootResult::Accepted);
    }

    #[tokio::test]
    async fn test_enumeration_failure_issues_no_reboots() {
        let mut compute = MockComputeApi::new();
        compute.expect_reboot_server().never();
        let mut source = MockNodeSource::new();
        source.expect_list_nodes().returning(|| {
            Err(NodemonError::Config("no cluster".to_string()))
        });

        let config = RunConfig {
            mode: EnumerationMode::ViaOrchestration,
            ..RunConfig::default()
        };
        assert!(run(&config, &compute, Some(&source)).await.is_err());
    }
}
