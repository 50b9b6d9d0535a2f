use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("solver directory returned {code} for solver {solver_id}")]
    Status { solver_id: u64, code: u16 },

    #[error("solver directory sent an invalid body for solver {solver_id}: {message}")]
    InvalidBody { solver_id: u64, message: String },

    #[error("solver directory timed out for solver {solver_id}")]
    Timeout { solver_id: u64 },

    #[error("solver directory unreachable for solver {solver_id}: {message}")]
    Transport { solver_id: u64, message: String },

    #[error("solver {solver_id} has no image and no default image is configured")]
    MissingImage { solver_id: u64 },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

pub type MetadataResult<T> = Result<T, MetadataError>;
