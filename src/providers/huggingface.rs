use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::model::{ModelRequest, Provider};
use crate::providers::{join_url, read_json, send};

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

pub(crate) fn inference_url(base_url: &str, model: &str) -> String {
    join_url(base_url, &format!("/models/{model}"))
}

/// Text-generation models answer `[{"generated_text": ...}]`; anything else is
/// shown to the caller as pretty-printed JSON.
fn render_output(body: &Value) -> Result<String> {
    if let Some(text) = body.pointer("/0/generated_text").and_then(Value::as_str) {
        return Ok(text.to_string());
    }
    serde_json::to_string_pretty(body).context("Failed to render inference response")
}

pub async fn complete(client: &Client, cfg: &Config, request: &ModelRequest) -> Result<String> {
    let api_url = inference_url(&cfg.huggingface_base_url, &request.model);
    if request.image.is_some() {
        debug!(model = %request.model, "inference api is text-only; ignoring attached image");
    }
    debug!(api_url = %api_url, model = %request.model, "sending inference request");

    let builder = client
        .post(&api_url)
        .bearer_auth(&request.credentials.api_key)
        .json(&InferenceRequest {
            inputs: &request.prompt,
        });
    let response = send(builder, &api_url, cfg.timeout_secs_for(Provider::HuggingFace)).await?;
    let parsed = read_json(response).await?;
    render_output(&parsed)
}
