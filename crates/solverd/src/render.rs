//! `solverd render` — print worker manifests without contacting anything.

use serde_json::{Value, json};

use solver_core::{ControllerConfig, SolverMetadata, WorkerIdentity, derive_names};
use solver_manifest::ManifestBuilder;
use solver_reconcile::convert;

/// The deployment and scaled object for `identity` as a `v1/List`, ready
/// for `kubectl apply -f -`.
pub fn render_manifests(
    config: &ControllerConfig,
    identity: WorkerIdentity,
    solver: &SolverMetadata,
) -> anyhow::Result<Value> {
    let names = derive_names(&config.tenant, identity);
    let builder = ManifestBuilder::new(config)?;

    let deployment = convert::deployment(&builder.build_deployment(identity, solver, &names));
    let scaled_object = convert::scaled_object(&builder.build_policy(identity, &names));

    Ok(json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            serde_json::to_value(deployment)?,
            serde_json::to_value(scaled_object)?,
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ControllerConfig {
        let mut config = solver_core::testing::test_config();
        config.worker.memory_gib = 2;
        config.scaling.cpu_utilization_percent = None;
        config
    }

    #[test]
    fn renders_deployment_and_scaled_object() {
        let identity = WorkerIdentity { solver_id: 3, vcpus: 2 };
        let solver = SolverMetadata {
            name: "ortools".to_string(),
            image_ref: "registry/ortools:9".to_string(),
        };

        let list = render_manifests(&test_config(), identity, &solver).unwrap();
        assert_eq!(list["kind"], "List");

        let items = list["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["kind"], "Deployment");
        assert_eq!(items[0]["metadata"]["name"], "solver-3-vcpus-2");
        assert!(items[0]["spec"]["template"]["spec"].get("imagePullSecrets").is_none());
        assert_eq!(items[1]["kind"], "ScaledObject");
        assert_eq!(items[1]["spec"]["triggers"].as_array().unwrap().len(), 1);
    }
}
