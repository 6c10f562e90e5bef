//! Submission lifecycle for SparkApplications
//!
//! Everything between a decoded submission request and the Kubernetes API:
//!
//! - [`reconciler`]: create, overwrite, delete and kill
//! - [`teardown`]: delete-and-confirm for dependent pods and services
//! - [`resolver`]: image table lookup and namespace defaults
//! - [`validator`]: final structural check before creation
//! - [`orchestrator`]: the Kubernetes seam

pub mod error;
pub mod lock;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod naming;
pub mod orchestrator;
pub mod reconciler;
pub mod resolver;
pub mod teardown;
pub mod validator;

pub use error::{OrchestratorError, ResourceKind, Result, SubmissionError};
pub use lock::SubmissionLocks;
#[cfg(any(test, feature = "testing"))]
pub use memory::InMemoryOrchestrator;
pub use orchestrator::{KubeOrchestrator, LogStream, Orchestrator};
pub use reconciler::Reconciler;
pub use resolver::{find_image, merge_defaults, SparkImage, SubmissionConfig};
pub use teardown::{delete_and_confirm, teardown_dependents, TeardownPolicy};
pub use validator::validate;
