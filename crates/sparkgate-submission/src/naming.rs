//! Names of dependent resources and gateway paths derived from a submission id

/// Pod name of executor `n`
pub fn executor_pod_name(submission_id: &str, n: u32) -> String {
    format!("{}-exec-{}", submission_id, n)
}

/// Service the Spark operator creates to expose the driver UI
pub fn ui_service_name(submission_id: &str) -> String {
    format!("{}-ui-svc", submission_id)
}

/// Gateway API root (`{prefix}/v1`) recovered from a submission route path
///
/// Accepts the paths of the submit, submit-with-id and status routes. Anything
/// else is returned unchanged.
pub fn api_root<'a>(path: &'a str, submission_id: &str) -> &'a str {
    let suffixes = [
        format!("/submissions/{}/status", submission_id),
        format!("/submissions/{}", submission_id),
        "/submissions".to_string(),
    ];
    suffixes
        .iter()
        .find_map(|suffix| path.strip_suffix(suffix.as_str()))
        .unwrap_or(path)
}

/// Path under which the Spark UI of `submission_id` is exposed
pub fn spark_ui_path(api_root: &str, submission_id: &str) -> String {
    format!("{}/sparkui/{}", api_root, submission_id)
}
