//! Kubernetes control plane over `kube`.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::Client;
use kube::api::{Api, PostParams};
use tracing::debug;

use solver_manifest::{AutoscalingPolicySpec, WorkerDeploymentSpec};

use crate::api::{CreateError, ResourceApi};
use crate::convert;
use crate::keda::ScaledObject;

/// Creates Deployments and KEDA ScaledObjects through the cluster API.
#[derive(Clone)]
pub struct KubeResourceApi {
    client: Client,
}

impl KubeResourceApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using in-cluster config or the local kubeconfig.
    pub async fn try_default() -> Result<Self, kube::Error> {
        Ok(Self::new(Client::try_default().await?))
    }
}

#[async_trait]
impl ResourceApi for KubeResourceApi {
    async fn create_deployment(&self, spec: &WorkerDeploymentSpec) -> Result<(), CreateError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &spec.namespace);
        let object = convert::deployment(spec);
        debug!(namespace = %spec.namespace, name = %spec.name, "POST deployment");
        api.create(&PostParams::default(), &object)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn create_policy(&self, spec: &AutoscalingPolicySpec) -> Result<(), CreateError> {
        let api: Api<ScaledObject> = Api::namespaced(self.client.clone(), &spec.namespace);
        let object = convert::scaled_object(spec);
        debug!(namespace = %spec.namespace, name = %spec.name, "POST scaled object");
        api.create(&PostParams::default(), &object)
            .await
            .map(|_| ())
            .map_err(map_error)
    }
}

fn map_error(err: kube::Error) -> CreateError {
    match err {
        kube::Error::Api(ae) if ae.code == 409 => CreateError::Conflict,
        kube::Error::Api(ae) => CreateError::Rejected {
            code: ae.code,
            message: ae.message,
        },
        other => CreateError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: String::new(),
            code,
        })
    }

    #[test]
    fn conflict_maps_to_already_exists() {
        assert_eq!(map_error(api_error(409, "exists")), CreateError::Conflict);
    }

    #[test]
    fn other_statuses_are_rejections() {
        assert_eq!(
            map_error(api_error(403, "forbidden")),
            CreateError::Rejected {
                code: 403,
                message: "forbidden".to_string(),
            }
        );
        assert!(matches!(
            map_error(api_error(422, "invalid")),
            CreateError::Rejected { code: 422, .. }
        ));
    }

    #[test]
    fn non_api_errors_are_transport() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = kube::Error::SerdeError(decode);
        assert!(matches!(map_error(err), CreateError::Transport(_)));
    }
}
