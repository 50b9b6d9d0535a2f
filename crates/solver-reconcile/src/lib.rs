//! solver-reconcile — idempotent apply of worker resources.
//!
//! The reconciler only ever *creates*. A conflict from the control plane
//! means the resource is already there and counts as success; anything
//! else fails the request. Updates, drift correction and teardown belong
//! to someone else.
//!
//! # Architecture
//!
//! ```text
//! Reconciler
//!   └── Arc<dyn ResourceApi>
//!       ├── KubeResourceApi      (apps/v1 Deployment + keda.sh ScaledObject)
//!       └── InMemoryResourceApi  (tests, dry runs)
//! ```
//!
//! Typed specs from `solver-manifest` are converted to Kubernetes objects
//! only inside `KubeResourceApi` (see [`convert`]).

pub mod api;
pub mod convert;
pub mod error;
pub mod keda;
pub mod kube_api;
pub mod memory;
pub mod reconciler;

pub use api::{CreateError, ResourceApi, ResourceKind};
pub use error::{ReconcileError, ReconcileResult};
pub use kube_api::KubeResourceApi;
pub use memory::{ApiCall, InMemoryResourceApi, JOURNAL_CAPACITY};
pub use reconciler::{Applied, EnsuredWorker, Reconciler};
