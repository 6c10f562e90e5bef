//! Sparkgate HTTP gateway
//!
//! Accepts Spark application submissions over HTTP and manages them as
//! `SparkApplication` resources on Kubernetes.
//!
//! # Endpoints
//!
//! All API routes live under `{prefix}/v1` and require basic credentials when a
//! user is configured.
//!
//! - `POST /submissions` - Submit with a server-generated or body-supplied id
//! - `POST /submissions/{id}?overwrite=` - Submit under a given id
//! - `GET /submissions?limit=&state=` - List submissions
//! - `GET /submissions/{id}/status` - Submission state
//! - `GET /submissions/{id}/log?executor=&follow=` - Driver or executor log
//! - `POST /submissions/{id}/kill` - Stop pods, keep the record
//! - `DELETE /submissions/{id}` - Delete the submission
//! - `POST /s3/upload?name=` - Upload an artifact to object storage
//! - `GET /`, `/health`, `/healthcheck` - Health check, no authentication

pub mod auth;
pub mod auth_chain;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod storage;

pub use auth_chain::{AuthChain, CredentialValidator, MultiUserValidator, SingleUserValidator};
pub use config::{GatewayArgs, GatewayConfig};
pub use error::{Error, Result};
pub use server::{router, start_server, AppState, ServerConfig};
pub use storage::{S3UploadStore, UploadStore};
