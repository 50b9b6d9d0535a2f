//! Routing-key derivation.
//!
//! Every name a worker needs is a pure function of the tenant and the
//! [`WorkerIdentity`]. Numeric components are rendered in decimal between
//! fixed separators, so two distinct identities never share a name.
//!
//! ```text
//! input queue   project-{tenant}-solver-{solver_id}-vcpus-{vcpus}
//! output queue  project-{tenant}-solver-{solver_id}-vcpus-{vcpus}-results
//! deployment    solver-{solver_id}-vcpus-{vcpus}
//! policy        solver-{solver_id}-vcpus-{vcpus}-scaler
//! ```

use serde::Serialize;

use crate::types::WorkerIdentity;

/// Queue and resource names for one worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WorkerNames {
    /// Queue the worker consumes solve requests from.
    pub input_queue: String,
    /// Queue the worker publishes results to.
    pub output_queue: String,
    pub deployment: String,
    pub policy: String,
}

/// Derive all names for `identity` under `tenant`.
///
/// The deployment is named after the identity rather than the solver's
/// display name (`solver-chuffed`): a name keyed on the solver alone would
/// be shared by every vcpu profile of that solver, so a 2-vcpu and an
/// 8-vcpu request would land on one deployment sized for whichever came
/// first. The display name is carried on the deployment as the
/// `solver-controller/solver-name` annotation instead.
pub fn derive_names(tenant: &str, identity: WorkerIdentity) -> WorkerNames {
    let WorkerIdentity { solver_id, vcpus } = identity;
    let input_queue = format!("project-{tenant}-solver-{solver_id}-vcpus-{vcpus}");
    let deployment = format!("solver-{solver_id}-vcpus-{vcpus}");

    WorkerNames {
        output_queue: format!("{input_queue}-results"),
        policy: format!("{deployment}-scaler"),
        input_queue,
        deployment,
    }
}
