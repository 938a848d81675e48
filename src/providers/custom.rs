use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::model::{ModelRequest, Provider};
use crate::providers::{read_json, send};

#[derive(Debug, Serialize)]
struct CustomRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

/// Posts `{prompt, model}` to the user-defined endpoint and returns the whole
/// JSON reply, pretty-printed.
pub async fn complete(client: &Client, cfg: &Config, request: &ModelRequest) -> Result<String> {
    let api_url = request.credentials.endpoint_url.trim();
    debug!(api_url = %api_url, model = %request.model, "sending custom endpoint request");

    let mut builder = client.post(api_url).json(&CustomRequest {
        prompt: &request.prompt,
        model: &request.model,
    });
    let auth_header = request.credentials.auth_header.trim();
    if !auth_header.is_empty() {
        builder = builder.header(AUTHORIZATION, auth_header);
    }

    let response = send(builder, api_url, cfg.timeout_secs_for(Provider::Custom)).await?;
    let parsed = read_json(response).await?;
    serde_json::to_string_pretty(&parsed).context("Failed to render custom endpoint response")
}
