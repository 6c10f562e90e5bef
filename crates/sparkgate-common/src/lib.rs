//! Shared types for the sparkgate workspace
//!
//! - [`crd`]: the Spark operator's `SparkApplication` custom resource, as far as
//!   the gateway reads and writes it
//! - [`wire`]: JSON request and response bodies exchanged between the gateway
//!   and its clients
//! - [`retry`]: deadline-based polling helper

pub mod crd;
pub mod retry;
pub mod wire;

pub use crd::{
    ApplicationState, DriverInfo, DriverSpec, ExecutorSpec, RestartPolicy, SparkApplication,
    SparkApplicationSpec, SparkApplicationStatus,
};
pub use retry::{retry_until, RetryError};
pub use wire::{
    ErrorResponse, ListSubmissionsResponse, SubmissionActionResponse, SubmissionRequest,
    SubmissionResponse, SubmissionStatusResponse, SubmissionSummary, UploadResponse,
};

/// Annotation holding the caller-supplied application name
pub const APPLICATION_NAME_ANNOTATION: &str = "sparkgate.io/application-name";

/// Annotation holding the caller-supplied application description
pub const APPLICATION_DESCRIPTION_ANNOTATION: &str = "sparkgate.io/application-description";
