//! Kubernetes backend for podrunner: every execution unit is a single-container pod.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::{
    api::core::v1::{Container, Pod, PodSpec},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use kube::{
    api::{DeleteParams, LogParams, PostParams},
    Api, Client,
};
use podrunner_core::{
    client::UnitClient, Error, ExecutionRequest, Operation, Result, UnitStatus,
};
use tracing::{debug, instrument};

/// Label attached to every pod created by podrunner
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "podrunner";

/// Name of the single container when none is configured
pub const DEFAULT_CONTAINER: &str = "main";

/// [`UnitClient`] backed by the pods collection of one namespace.
#[derive(Clone)]
pub struct KubeUnitClient {
    pods: Api<Pod>,
    namespace: String,
    container: String,
}

impl KubeUnitClient {
    pub fn new(client: Client, namespace: &str, container: impl Into<String>) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            container: container.into(),
        }
    }

    /// Build a client from ambient credentials: the local kubeconfig, or the in-cluster
    /// service account when running inside a pod.
    pub async fn try_default(
        namespace: &str,
        container: impl Into<String>,
    ) -> core::result::Result<Self, kube::Error> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, namespace, container))
    }
}

#[async_trait]
impl UnitClient for KubeUnitClient {
    #[instrument(skip(self, request), fields(namespace = %self.namespace))]
    async fn create(&self, name: &str, request: &ExecutionRequest) -> Result<()> {
        let pod = pod_manifest(name, &self.container, request);
        self.pods
            .create(&PostParams::default(), &pod)
            .await
            .map_err(|e| api_error(Operation::Create, name, e))?;

        debug!("Pod created");
        Ok(())
    }

    async fn inspect(&self, name: &str) -> Result<UnitStatus> {
        let pod = self
            .pods
            .get(name)
            .await
            .map_err(|e| api_error(Operation::Inspect, name, e))?;

        Ok(unit_status(&pod))
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn fetch_output(&self, name: &str) -> Result<String> {
        let params = LogParams {
            container: Some(self.container.clone()),
            ..LogParams::default()
        };

        self.pods
            .logs(name, &params)
            .await
            .map_err(|e| api_error(Operation::FetchOutput, name, e))
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn delete(&self, name: &str) -> Result<()> {
        self.pods
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| api_error(Operation::Delete, name, e))?;

        debug!("Pod deletion requested");
        Ok(())
    }
}

/// Pod running `request` in one container that is never restarted, so its exit code is
/// observed exactly once.
pub fn pod_manifest(name: &str, container: &str, request: &ExecutionRequest) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            ..ObjectMeta::default()
        },
        spec: Some(PodSpec {
            restart_policy: Some("Never".to_string()),
            containers: vec![Container {
                name: container.to_string(),
                image: Some(request.image.clone()),
                command: Some(vec![request.command.clone()]),
                args: Some(request.args.clone()),
                ..Container::default()
            }],
            ..PodSpec::default()
        }),
        ..Pod::default()
    }
}

/// Classify a pod by the state of its first container.
pub fn unit_status(pod: &Pod) -> UnitStatus {
    let state = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .and_then(|statuses| statuses.first())
        .and_then(|status| status.state.as_ref());

    match state {
        Some(state) => match (&state.terminated, &state.running) {
            (Some(terminated), _) => UnitStatus::Terminated {
                exit_code: terminated.exit_code,
            },
            (None, Some(_)) => UnitStatus::Running,
            (None, None) => UnitStatus::Pending,
        },
        None => UnitStatus::Pending,
    }
}

fn api_error(operation: Operation, name: &str, error: kube::Error) -> Error {
    match error {
        kube::Error::Api(ref response) if response.code == 404 => Error::not_found(operation, name),
        other => Error::orchestrator(operation, name, other),
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateRunning, ContainerStateTerminated, ContainerStateWaiting,
        ContainerStatus, PodStatus,
    };
    use kube::core::ErrorResponse;
    use rstest::rstest;

    use super::*;

    fn pod_with_state(state: Option<ContainerState>) -> Pod {
        Pod {
            status: Some(PodStatus {
                container_statuses: Some(vec![ContainerStatus {
                    name: DEFAULT_CONTAINER.to_string(),
                    state,
                    ..ContainerStatus::default()
                }]),
                ..PodStatus::default()
            }),
            ..Pod::default()
        }
    }

    fn api_failure(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("pods \"unit\" {reason}"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_pod_manifest_runs_single_container_once() {
        let request = ExecutionRequest::new("alpine", "echo", vec!["hi".to_string()]);

        let pod = pod_manifest("podrunner-abc", DEFAULT_CONTAINER, &request);

        assert_eq!(pod.metadata.name.as_deref(), Some("podrunner-abc"));
        assert_eq!(
            pod.metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(MANAGED_BY_LABEL))
                .map(String::as_str),
            Some(MANAGED_BY_VALUE)
        );

        let spec = pod.spec.expect("pod spec");
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(spec.containers.len(), 1);

        let container = &spec.containers[0];
        assert_eq!(container.name, "main");
        assert_eq!(container.image.as_deref(), Some("alpine"));
        assert_eq!(container.command, Some(vec!["echo".to_string()]));
        assert_eq!(container.args, Some(vec!["hi".to_string()]));
    }

    #[rstest]
    #[case::no_state(None, UnitStatus::Pending)]
    #[case::waiting(
        Some(ContainerState {
            waiting: Some(ContainerStateWaiting { reason: Some("ContainerCreating".to_string()), ..Default::default() }),
            ..Default::default()
        }),
        UnitStatus::Pending
    )]
    #[case::running(
        Some(ContainerState { running: Some(ContainerStateRunning::default()), ..Default::default() }),
        UnitStatus::Running
    )]
    #[case::terminated(
        Some(ContainerState {
            terminated: Some(ContainerStateTerminated { exit_code: 7, ..Default::default() }),
            ..Default::default()
        }),
        UnitStatus::Terminated { exit_code: 7 }
    )]
    fn test_unit_status_from_container_state(
        #[case] state: Option<ContainerState>,
        #[case] expected: UnitStatus,
    ) {
        assert_eq!(unit_status(&pod_with_state(state)), expected);
    }

    #[test]
    fn test_unit_status_without_container_statuses_is_pending() {
        assert_eq!(unit_status(&Pod::default()), UnitStatus::Pending);

        let scheduled = Pod {
            status: Some(PodStatus {
                phase: Some("Pending".to_string()),
                ..PodStatus::default()
            }),
            ..Pod::default()
        };
        assert_eq!(unit_status(&scheduled), UnitStatus::Pending);
    }

    #[rstest]
    #[case::not_found(404, "not found", "not_found")]
    #[case::conflict(409, "already exists", "orchestrator")]
    #[case::forbidden(403, "is forbidden", "orchestrator")]
    #[case::bad_request(400, "container \"main\" in pod \"unit\" is waiting to start", "orchestrator")]
    fn test_api_error_classification(
        #[case] code: u16,
        #[case] reason: &str,
        #[case] kind: &str,
    ) {
        let error = api_error(Operation::Inspect, "unit", api_failure(code, reason));

        assert_eq!(error.kind(), kind);
        assert_eq!(error.unit_name(), Some("unit"));
    }
}
