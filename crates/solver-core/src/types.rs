//! Queue message types and the worker identity key.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A solve request as it arrives on the control queue.
///
/// Every field is required; the unsigned types reject negative ids at
/// parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveRequest {
    pub problem_id: u64,
    pub instance_id: u64,
    pub solver_id: u64,
    pub vcpus: u32,
}

/// Why an inbound message body could not become a [`SolveRequest`].
#[derive(Debug, Error)]
pub enum MalformedRequest {
    #[error("invalid request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("vcpus must be at least 1")]
    ZeroVcpus,
}

impl SolveRequest {
    /// Parse and validate a raw message body.
    pub fn from_slice(body: &[u8]) -> Result<Self, MalformedRequest> {
        let request: SolveRequest = serde_json::from_slice(body)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), MalformedRequest> {
        if self.vcpus == 0 {
            return Err(MalformedRequest::ZeroVcpus);
        }
        Ok(())
    }

    /// The worker this request is routed to.
    pub fn identity(&self) -> WorkerIdentity {
        WorkerIdentity {
            solver_id: self.solver_id,
            vcpus: self.vcpus,
        }
    }
}

/// The (solver, resource profile) pair that owns a deployment, a scaling
/// policy and a pair of queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub solver_id: u64,
    pub vcpus: u32,
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "solver-{}/vcpus-{}", self.solver_id, self.vcpus)
    }
}

/// Display name and image of a solver, as returned by the solver directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverMetadata {
    pub name: String,
    #[serde(rename = "image_path")]
    pub image_ref: String,
}

/// A solve request enriched with solver metadata and resource links.
///
/// Serializes to the work-item format expected by solver workers. The
/// image and resource profile only matter to the controller and stay
/// off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedSolveRequest {
    pub solver_id: u64,
    pub solver_name: String,
    pub problem_id: u64,
    pub instance_id: u64,
    pub problem_url: String,
    pub instance_url: String,
    #[serde(skip)]
    pub solver_image_ref: String,
    #[serde(skip)]
    pub vcpus: u32,
}

impl EnrichedSolveRequest {
    pub fn identity(&self) -> WorkerIdentity {
        WorkerIdentity {
            solver_id: self.solver_id,
            vcpus: self.vcpus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_control_message() {
        let req = SolveRequest::from_slice(
            br#"{"problem_id":7,"instance_id":3,"solver_id":42,"vcpus":4}"#,
        )
        .unwrap();
        assert_eq!(req.problem_id, 7);
        assert_eq!(req.identity(), WorkerIdentity { solver_id: 42, vcpus: 4 });
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = SolveRequest::from_slice(br#"{"problem_id":7,"instance_id":3,"vcpus":4}"#)
            .unwrap_err();
        assert!(matches!(err, MalformedRequest::Body(_)));
        assert!(err.to_string().contains("solver_id"));
    }

    #[test]
    fn non_numeric_and_negative_ids_are_malformed() {
        assert!(
            SolveRequest::from_slice(br#"{"problem_id":"7","instance_id":3,"solver_id":42,"vcpus":4}"#)
                .is_err()
        );
        assert!(
            SolveRequest::from_slice(br#"{"problem_id":7,"instance_id":3,"solver_id":-1,"vcpus":4}"#)
                .is_err()
        );
    }

    #[test]
    fn zero_vcpus_is_malformed() {
        let err = SolveRequest::from_slice(br#"{"problem_id":1,"instance_id":1,"solver_id":1,"vcpus":0}"#)
            .unwrap_err();
        assert!(matches!(err, MalformedRequest::ZeroVcpus));
    }

    #[test]
    fn not_json_is_malformed() {
        assert!(SolveRequest::from_slice(b"solve 42 please").is_err());
    }

    #[test]
    fn metadata_reads_image_path() {
        let meta: SolverMetadata =
            serde_json::from_str(r#"{"name":"chuffed","image_path":"registry/chuffed:1.2"}"#)
                .unwrap();
        assert_eq!(meta.image_ref, "registry/chuffed:1.2");
    }

    #[test]
    fn enriched_request_wire_shape() {
        let enriched = EnrichedSolveRequest {
            solver_id: 42,
            solver_name: "chuffed".to_string(),
            problem_id: 7,
            instance_id: 3,
            problem_url: "http://api/problems/7/file".to_string(),
            instance_url: "http://api/problems/7/instances/3/file".to_string(),
            solver_image_ref: "registry/chuffed:1.2".to_string(),
            vcpus: 4,
        };

        let value = serde_json::to_value(&enriched).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 6);
        assert_eq!(object["solver_name"], "chuffed");
        assert!(!object.contains_key("solver_image_ref"));
        assert!(!object.contains_key("vcpus"));
    }

    #[test]
    fn identity_display() {
        let id = WorkerIdentity { solver_id: 42, vcpus: 4 };
        assert_eq!(id.to_string(), "solver-42/vcpus-4");
    }
}
