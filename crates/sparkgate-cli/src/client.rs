//! HTTP client for the gateway API

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};
use url::Url;

use sparkgate_common::{
    retry_until, ListSubmissionsResponse, RetryError, SubmissionActionResponse,
    SubmissionRequest, SubmissionResponse, SubmissionStatusResponse, UploadResponse,
};

use crate::config::Credential;
use crate::{Error, Result};

const STATUS_RETRY_MAX_WAIT: Duration = Duration::from_secs(60);
const STATUS_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Client for one gateway, authenticating with basic credentials
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base: Url,
    user: String,
    password: String,
    status_max_wait: Duration,
    status_interval: Duration,
}

impl GatewayClient {
    /// `credential.server` is the API root, e.g. `http://host:8080/sparkapi/v1`
    pub fn new(credential: &Credential, insecure: bool) -> Result<Self> {
        let base = Url::parse(&credential.server).map_err(|e| Error::InvalidUrl {
            url: credential.server.clone(),
            message: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidUrl {
                url: credential.server.clone(),
                message: "not an http url".to_string(),
            });
        }

        let http = if insecure {
            info!("Skipping TLS certificate verification");
            reqwest::Client::builder()
                .danger_accept_invalid_certs(true)
                .build()?
        } else {
            reqwest::Client::new()
        };

        Ok(Self {
            http,
            base,
            user: credential.user.clone(),
            password: credential.password.clone(),
            status_max_wait: STATUS_RETRY_MAX_WAIT,
            status_interval: STATUS_RETRY_INTERVAL,
        })
    }

    /// Override how long status requests are retried
    pub fn with_status_retry(mut self, max_wait: Duration, interval: Duration) -> Self {
        self.status_max_wait = max_wait;
        self.status_interval = interval;
        self
    }

    /// API root this client talks to
    pub fn server(&self) -> &str {
        self.base.as_str()
    }

    /// Submit under a server-generated id
    pub async fn submit(&self, request: &SubmissionRequest) -> Result<String> {
        let url = self.endpoint(&["submissions"])?;
        self.submit_to(url, request).await
    }

    /// Submit under `id`, replacing an existing submission when `overwrite` is set
    pub async fn submit_with_id(
        &self,
        request: &SubmissionRequest,
        id: &str,
        overwrite: bool,
    ) -> Result<String> {
        let mut url = self.endpoint(&["submissions", id])?;
        if overwrite {
            url.query_pairs_mut().append_pair("overwrite", "true");
        }
        self.submit_to(url, request).await
    }

    async fn submit_to(&self, url: Url, request: &SubmissionRequest) -> Result<String> {
        let builder = self.request(Method::POST, url.clone()).json(request);
        let response = self.send(builder, &url).await?;
        let (body, parsed): (_, SubmissionResponse) = read_json(response, &url).await?;
        if parsed.submission_id.is_empty() {
            return Err(Error::command_failed(format!(
                "failed to submit application, response: {}",
                body
            )));
        }
        Ok(parsed.submission_id)
    }

    /// Submission status; transient failures are retried for up to a minute
    pub async fn status(&self, id: &str) -> Result<(String, SubmissionStatusResponse)> {
        self.status_within(id, self.status_max_wait).await
    }

    /// Like [`status`](Self::status), retrying for at most `budget`
    pub async fn status_within(
        &self,
        id: &str,
        budget: Duration,
    ) -> Result<(String, SubmissionStatusResponse)> {
        let url = self.endpoint(&["submissions", id, "status"])?;
        let last = Mutex::new(None);

        let outcome = {
            let url = &url;
            let last = &last;
            retry_until(
                move || async move {
                    let result = self
                        .get_json::<SubmissionStatusResponse>(url.clone())
                        .await;
                    let done = match &result {
                        Ok(_) => true,
                        Err(e) if e.is_client_error() => true,
                        Err(e) => {
                            warn!(url = %url, error = %e, "Failed to get status, retrying");
                            false
                        }
                    };
                    *last.lock().await = Some(result);
                    Ok::<_, Error>(done)
                },
                budget.min(self.status_max_wait),
                self.status_interval,
            )
            .await
        };
        if let Err(RetryError::Aborted(e)) = outcome {
            return Err(e);
        }

        let (body, status) = last
            .into_inner()
            .ok_or_else(|| Error::command_failed(format!("no response from {}", url)))??;
        if status.submission_id.is_empty() {
            return Err(Error::command_failed(format!(
                "failed to get application status, response: {}",
                body
            )));
        }
        Ok((body, status))
    }

    /// List submissions, optionally limited and filtered by state
    pub async fn list(
        &self,
        limit: Option<u32>,
        state: Option<&str>,
    ) -> Result<(String, ListSubmissionsResponse)> {
        let mut url = self.endpoint(&["submissions"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(limit) = limit.filter(|l| *l > 0) {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(state) = state.filter(|s| !s.is_empty()) {
                query.append_pair("state", state);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.get_json(url).await
    }

    pub async fn delete(&self, id: &str) -> Result<(String, SubmissionActionResponse)> {
        let url = self.endpoint(&["submissions", id])?;
        let response = self
            .send(self.request(Method::DELETE, url.clone()), &url)
            .await?;
        read_json(response, &url).await
    }

    pub async fn kill(&self, id: &str) -> Result<(String, SubmissionActionResponse)> {
        let url = self.endpoint(&["submissions", id, "kill"])?;
        let response = self
            .send(self.request(Method::POST, url.clone()), &url)
            .await?;
        read_json(response, &url).await
    }

    /// Stream a driver log, or an executor log when `executor >= 0`
    pub async fn log(
        &self,
        id: &str,
        executor: i64,
        follow: bool,
    ) -> Result<impl Stream<Item = std::io::Result<Bytes>>> {
        let mut url = self.endpoint(&["submissions", id, "log"])?;
        {
            let mut query = url.query_pairs_mut();
            if executor >= 0 {
                query.append_pair("executor", &executor.to_string());
            }
            if follow {
                query.append_pair("follow", "true");
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        debug!(url = %url, "Fetching log");
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        Ok(response.bytes_stream().map_err(std::io::Error::other))
    }

    /// Stream a local file to the gateway's object storage, returning its URL
    pub async fn upload(&self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::validation(format!("invalid file name {}", path.display())))?;

        let file = tokio::fs::File::open(path).await.map_err(|e| {
            Error::command_failed(format!("cannot open file {}: {}", path.display(), e))
        })?;
        let size = file
            .metadata()
            .await
            .map_err(|e| {
                Error::command_failed(format!("cannot get info for file {}: {}", path.display(), e))
            })?
            .len();

        let mut url = self.endpoint(&["s3", "upload"])?;
        url.query_pairs_mut().append_pair("name", name);

        info!(file = %path.display(), url = %url, size, "Uploading file");
        let builder = self
            .request(Method::POST, url.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)));
        let response = self.send(builder, &url).await?;

        let (body, parsed): (_, UploadResponse) = read_json(response, &url).await?;
        if parsed.url.is_empty() {
            return Err(Error::command_failed(format!(
                "failed to upload file, response: {}",
                body
            )));
        }
        Ok(parsed.url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl {
                url: self.base.to_string(),
                message: "not an http url".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        if self.user.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.user, Some(&self.password))
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &Url) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => e.to_string(),
        };
        Err(Error::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<(String, T)> {
        let response = self.send(self.request(Method::GET, url.clone()), &url).await?;
        read_json(response, &url).await
    }
}

/// Read a JSON body, keeping the raw text for display
async fn read_json<T: DeserializeOwned>(response: Response, url: &Url) -> Result<(String, T)> {
    let body = response.text().await?;
    let parsed = serde_json::from_str(&body).map_err(|e| {
        Error::command_failed(format!(
            "failed to parse response from {}: {}, response: {}",
            url, e, body
        ))
    })?;
    Ok((body, parsed))
}
