pub mod custom;
pub mod gemini;
pub(crate) mod http_errors;
pub mod huggingface;
pub mod openai;

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::warn;

use crate::providers::http_errors::model_api_request_error;

/// Sends a prepared request with a bounded timeout and rejects non-success statuses.
/// `api_url` is only used for messages and must not carry secrets.
pub(crate) async fn send(
    builder: RequestBuilder,
    api_url: &str,
    timeout_secs: u64,
) -> Result<Response> {
    let response = builder
        .timeout(Duration::from_secs(timeout_secs))
        .send()
        .await
        .map_err(|err| {
            let err = err.without_url();
            warn!(api_url = %api_url, error = %err, "model api request failed");
            model_api_request_error(err, api_url, timeout_secs)
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let response_body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        warn!(
            api_url = %api_url,
            status = %status,
            response_body_len = response_body.len(),
            "model api returned non-success status"
        );
        return Err(anyhow!(
            "Model request failed with status {}: {}",
            status,
            response_body
        ));
    }

    Ok(response)
}

pub(crate) async fn read_json(response: Response) -> Result<Value> {
    response
        .json::<Value>()
        .await
        .context("Failed to parse model response body as JSON")
}

/// Reads the string at a JSON pointer, failing with the missing path when the
/// response does not have the expected shape.
pub(crate) fn text_at(body: &Value, pointer: &str) -> Result<String> {
    body.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("Unexpected response shape: missing '{}'", pointer))
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
