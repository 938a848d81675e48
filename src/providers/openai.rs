use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::model::{MessageRole, ModelRequest, Provider};
use crate::providers::{join_url, read_json, send, text_at};

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const STREAM_DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    top_p: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclaration<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ToolDeclaration<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

pub(crate) fn chat_url(base_url: &str) -> String {
    join_url(base_url, "/v1/chat/completions")
}

fn user_message(request: &ModelRequest) -> ChatMessage {
    let content = match &request.image {
        Some(image) => MessageContent::Parts(vec![
            ContentPart::Text {
                text: request.prompt.clone(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_uri(),
                },
            },
        ]),
        None => MessageContent::Text(request.prompt.clone()),
    };
    ChatMessage {
        role: MessageRole::User.as_str(),
        content,
    }
}

fn build_request(request: &ModelRequest) -> ChatCompletionRequest<'_> {
    ChatCompletionRequest {
        model: &request.model,
        messages: vec![
            ChatMessage {
                role: MessageRole::System.as_str(),
                content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
            },
            user_message(request),
        ],
        temperature: request.sampling.temperature,
        top_p: request.sampling.top_p,
        stream: request.streaming,
        tools: request
            .tools
            .iter()
            .map(|hint| ToolDeclaration {
                kind: hint.as_str(),
            })
            .collect(),
    }
}

/// Folds a server-sent-event body into the concatenated delta text.
fn collect_stream(body: &str) -> Result<String> {
    let mut content = String::new();
    let mut events = 0usize;

    for line in body.lines() {
        let Some(data) = line.trim().strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data == STREAM_DONE_MARKER {
            break;
        }
        let chunk: Value =
            serde_json::from_str(data).context("Failed to parse OpenAI stream chunk")?;
        events += 1;
        if let Some(delta) = chunk
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
        {
            content.push_str(delta);
        }
    }

    if events == 0 {
        return Err(anyhow!("Stream response contained no data events"));
    }
    Ok(content)
}

pub async fn complete(client: &Client, cfg: &Config, request: &ModelRequest) -> Result<String> {
    let api_url = chat_url(&cfg.openai_base_url);
    let body = build_request(request);
    debug!(
        api_url = %api_url,
        model = %request.model,
        streaming = request.streaming,
        "sending openai chat completion request"
    );

    let builder = client
        .post(&api_url)
        .bearer_auth(&request.credentials.api_key)
        .json(&body);
    let response = send(builder, &api_url, cfg.timeout_secs_for(Provider::OpenAi)).await?;

    let content = if request.streaming {
        let raw = response
            .text()
            .await
            .context("Failed to read OpenAI stream body")?;
        collect_stream(&raw)?
    } else {
        let parsed = read_json(response).await?;
        text_at(&parsed, "/choices/0/message/content")?
    };
    debug!(
        model = %request.model,
        response_len = content.len(),
        "received openai chat completion"
    );
    Ok(content)
}
