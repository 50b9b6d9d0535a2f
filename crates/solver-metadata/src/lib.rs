//! solver-metadata — enrichment data for solve requests.
//!
//! Two pieces:
//! - [`SolverDirectory`]: looks up a solver's display name and worker image
//!   by id. [`HttpSolverDirectory`] does one bounded GET per lookup.
//! - [`ProblemLinks`]: pure URL composition for the problem and instance
//!   files a worker downloads.
//!
//! Every lookup failure is retryable from the dispatcher's point of view:
//! the directory may come back, or be fixed.

pub mod directory;
pub mod error;
pub mod links;

pub use directory::{HttpSolverDirectory, SolverDirectory};
pub use error::{MetadataError, MetadataResult};
pub use links::ProblemLinks;
