//! `sparkcli submit <app-file> [args...]`
//!
//! Local application files are uploaded first. Unless
//! `spark.kubernetes.submission.waitAppCompletion=false` is passed with
//! `--conf`, the command then waits for the application to finish.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;
use url::Url;

use sparkgate_common::crd::state;
use sparkgate_common::{retry_until, RetryError, SubmissionRequest, SubmissionResponse};

use super::emit;
use crate::client::GatewayClient;
use crate::{Error, Result};

const WAIT_APP_COMPLETION_CONF: &str = "spark.kubernetes.submission.waitAppCompletion";
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Terminal states, matched case-insensitively
const FINISHED_STATES: &[&str] = &[
    state::COMPLETED,
    state::FAILED,
    state::SUBMISSION_FAILED,
    "SUCCESS",
    "SUCCEEDED",
    "CANCELLED",
];

/// Terminal states that make the command fail
const FAILED_STATES: &[&str] = &[state::FAILED, state::SUBMISSION_FAILED];

/// Submit a Spark application
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Submission id; lets a streaming application be submitted at most once
    #[arg(long)]
    pub id: Option<String>,

    /// Replace a running submission with the same id (requires --id)
    #[arg(long)]
    pub overwrite: bool,

    #[arg(long)]
    pub application_name: Option<String>,

    #[arg(long)]
    pub desired_state: Option<String>,

    /// How long to wait for the application to finish
    #[arg(long, default_value_t = 24 * 60 * 60)]
    pub max_wait_seconds: u64,

    /// Main class of a JVM application
    #[arg(long = "class")]
    pub main_class: Option<String>,

    #[arg(long)]
    pub image: Option<String>,

    #[arg(long)]
    pub spark_version: Option<String>,

    /// Application type (Java, Scala, Python, R)
    #[arg(long = "type")]
    pub app_type: Option<String>,

    /// Spark config entry, repeatable
    #[arg(long = "conf", value_name = "KEY=VALUE")]
    pub conf: Vec<String>,

    #[arg(long, default_value_t = 1)]
    pub driver_cores: i32,

    #[arg(long, default_value = "1g")]
    pub driver_memory: String,

    #[arg(long, default_value_t = 1)]
    pub num_executors: i32,

    #[arg(long, default_value_t = 1)]
    pub executor_cores: i32,

    #[arg(long, default_value = "1g")]
    pub executor_memory: String,

    #[arg(long, default_value_t = 0)]
    pub failure_retries: i32,

    /// Also write the response to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Application jar or python file, local or remote
    pub application_file: String,

    /// Arguments passed to the application
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub arguments: Vec<String>,
}

pub async fn run(args: SubmitArgs, client: &GatewayClient) -> Result<()> {
    let id = args.id.clone().filter(|id| !id.is_empty());
    if args.overwrite && id.is_none() {
        return Err(Error::validation(
            "cannot overwrite a Spark application without --id",
        ));
    }

    let spark_conf = parse_conf(&args.conf);
    let wait = wait_app_completion(&spark_conf);

    let mut application_file = args.application_file.clone();
    if let Some(path) = local_path(&application_file) {
        info!(file = %path.display(), "Uploading local application file");
        application_file = client.upload(&path).await?;
        info!(url = %application_file, "Uploaded application file");
    }

    let request = build_request(&args, application_file, spark_conf);
    let submission_id = match &id {
        Some(id) => client.submit_with_id(&request, id, args.overwrite).await?,
        None => client.submit(&request).await?,
    };
    info!(submission = %submission_id, "Submitted application");

    let response = serde_json::to_string(&SubmissionResponse {
        submission_id: submission_id.clone(),
    })?;
    emit(&response, args.output.as_deref())?;

    if wait {
        let final_state = wait_for_completion(
            client,
            &submission_id,
            Duration::from_secs(args.max_wait_seconds),
            WAIT_POLL_INTERVAL,
        )
        .await?;
        if is_one_of(&final_state, FAILED_STATES) {
            return Err(Error::command_failed(format!(
                "application {} finished with state {}",
                submission_id, final_state
            )));
        }
    }

    info!(
        "Check the application log with: sparkcli --url {} log {}",
        client.server(),
        submission_id
    );
    Ok(())
}

fn build_request(
    args: &SubmitArgs,
    application_file: String,
    spark_conf: BTreeMap<String, String>,
) -> SubmissionRequest {
    let mut request = SubmissionRequest {
        application_name: non_empty(&args.application_name),
        desired_state: non_empty(&args.desired_state),
        ..SubmissionRequest::default()
    };

    let spec = &mut request.spec;
    spec.image = non_empty(&args.image);
    spec.spark_version = non_empty(&args.spark_version);
    spec.app_type = non_empty(&args.app_type);
    spec.main_class = non_empty(&args.main_class);
    spec.main_application_file = Some(application_file);
    spec.arguments = args.arguments.clone();
    spec.spark_conf = spark_conf;
    spec.failure_retries = Some(args.failure_retries);
    spec.driver.cores = Some(args.driver_cores);
    spec.driver.memory = Some(args.driver_memory.clone());
    spec.executor.instances = Some(args.num_executors);
    spec.executor.cores = Some(args.executor_cores);
    spec.executor.memory = Some(args.executor_memory.clone());

    request
}

/// `key=value` entries; an entry without `=` maps to an empty value
pub fn parse_conf(entries: &[String]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (entry.clone(), String::new()),
        })
        .collect()
}

/// Path of a local file: no scheme, or a `file:` URL
pub fn local_path(file: &str) -> Option<PathBuf> {
    match Url::parse(file) {
        Ok(url) if url.scheme().eq_ignore_ascii_case("file") => url.to_file_path().ok(),
        Ok(_) => None,
        Err(url::ParseError::RelativeUrlWithoutBase) => Some(Path::new(file).to_path_buf()),
        Err(_) => None,
    }
}

fn wait_app_completion(spark_conf: &BTreeMap<String, String>) -> bool {
    spark_conf
        .get(WAIT_APP_COMPLETION_CONF)
        .is_none_or(|value| !value.eq_ignore_ascii_case("false"))
}

fn is_one_of(value: &str, states: &[&str]) -> bool {
    states.iter().any(|s| s.eq_ignore_ascii_case(value))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Poll until the submission reaches a terminal state, returning it
async fn wait_for_completion(
    client: &GatewayClient,
    id: &str,
    max_wait: Duration,
    interval: Duration,
) -> Result<String> {
    let last_state = Mutex::new(String::new());
    let deadline = Instant::now() + max_wait;

    let outcome = {
        let last_state = &last_state;
        retry_until(
            move || async move {
                // Status retries must not outlast the overall wait
                let budget = deadline.saturating_duration_since(Instant::now());
                let (_, status) = client.status_within(id, budget).await?;
                let finished = is_one_of(&status.state, FINISHED_STATES);
                if finished {
                    info!(submission = %id, state = %status.state, "Application finished");
                } else {
                    info!(submission = %id, state = %status.state, "Waiting for application to finish");
                }
                *last_state.lock().await = status.state;
                Ok::<_, Error>(finished)
            },
            max_wait,
            interval,
        )
        .await
    };

    match outcome {
        Ok(()) => Ok(last_state.into_inner()),
        Err(RetryError::Aborted(e)) => Err(e),
        Err(RetryError::Timeout { elapsed, .. }) => Err(Error::command_failed(format!(
            "application {} not finished after {:?} (last state {})",
            id,
            elapsed,
            last_state.into_inner()
        ))),
    }
}
