//! Submission error types

use std::fmt;
use std::time::Duration;

/// Result alias for submission operations
pub type Result<T> = std::result::Result<T, SubmissionError>;

/// Orchestrator-managed resource kinds the gateway touches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The SparkApplication itself
    Application,
    /// Driver or executor pod
    Pod,
    /// Spark UI service
    Service,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application => write!(f, "SparkApplication"),
            Self::Pod => write!(f, "Pod"),
            Self::Service => write!(f, "Service"),
        }
    }
}

/// Failure talking to the orchestrator
///
/// Not-found is its own variant so callers can treat it as an ordinary
/// outcome instead of a failure.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("{operation} {kind} {name} rejected ({code}): {message}")]
    Api {
        operation: &'static str,
        kind: ResourceKind,
        name: String,
        code: u16,
        message: String,
    },

    #[error("{operation} {kind} {name} failed: {message}")]
    Transport {
        operation: &'static str,
        kind: ResourceKind,
        name: String,
        message: String,
    },
}

impl OrchestratorError {
    /// Classify a kube client error for `operation` on `kind`/`name`
    pub fn from_kube(
        operation: &'static str,
        kind: ResourceKind,
        name: &str,
        err: kube::Error,
    ) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::NotFound {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(ae) => Self::Api {
                operation,
                kind,
                name: name.to_string(),
                code: ae.code,
                message: ae.message,
            },
            other => Self::Transport {
                operation,
                kind,
                name: name.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Whether the resource did not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors surfaced by the reconciler and its helpers
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Existence could not be determined, or a read failed
    #[error("orchestrator error: {0}")]
    Orchestrator(#[source] OrchestratorError),

    /// The id is taken and overwrite was not requested
    #[error(
        "submission {id} already exists in namespace {namespace} (created at {created_at}); \
         set overwrite to replace it"
    )]
    Conflict {
        id: String,
        namespace: String,
        created_at: String,
    },

    /// The spec is missing something required after defaulting
    #[error("invalid submission: {message}")]
    Validation { message: String },

    /// The orchestrator refused to create the resource
    #[error("failed to create submission {id}: {source}")]
    Rejected {
        id: String,
        #[source]
        source: OrchestratorError,
    },

    #[error("submission {id} not found")]
    NotFound { id: String },

    /// Deleted resource was still present at the deadline
    #[error("{kind} {name} still present after {waited:?}")]
    TeardownTimeout {
        kind: ResourceKind,
        name: String,
        waited: Duration,
    },
}

impl SubmissionError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Map a read error on `id`, turning not-found into [`SubmissionError::NotFound`]
    pub fn from_lookup(id: &str, err: OrchestratorError) -> Self {
        if err.is_not_found() {
            Self::NotFound { id: id.to_string() }
        } else {
            Self::Orchestrator(err)
        }
    }
}
