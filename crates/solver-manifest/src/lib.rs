//! solver-manifest — declarative worker resources.
//!
//! Turns a `WorkerIdentity`, its solver metadata and its derived names into
//! two records: a `WorkerDeploymentSpec` (what runs) and an
//! `AutoscalingPolicySpec` (how many of it run). Both are plain values with
//! no timestamps or generated ids, so rebuilding them from the same inputs
//! yields an equal record and re-applying it is a no-op.
//!
//! # Resource shape
//!
//! ```text
//! replicas      = scaling.min_replicas          (0 ⇒ scale-to-zero)
//! cpu           = request vcpus   (request == limit)
//! memory        = worker.memory_gib Gi  (request == limit)
//! security      = non-root, no privilege escalation, read-only rootfs,
//!                 all capabilities dropped, RuntimeDefault seccomp
//! env           = broker endpoint + credentials, queue names, CPU_LIMIT
//!
//! triggers      = queue length  (replicas ≈ ceil(depth / per_replica))
//!               + cpu utilization  (optional)
//! polling       = 1s, cooldown = 2s
//! ```
//!
//! Conversion to the control plane's wire format happens in
//! `solver-reconcile`.

pub mod builder;
pub mod spec;

pub use builder::{COOLDOWN_PERIOD_SECS, ManifestBuilder, POLLING_INTERVAL_SECS};
pub use spec::*;
