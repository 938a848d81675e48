use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;
use crate::model::{ModelRequest, Provider};
use crate::providers::{join_url, read_json, send, text_at};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
}

/// The key travels as a query parameter, so this URL is safe to log.
pub(crate) fn generate_url(base_url: &str, model: &str) -> String {
    join_url(base_url, &format!("/v1beta/models/{model}:generateContent"))
}

fn tool_declaration(hint: &str) -> Option<Value> {
    match hint.trim().to_ascii_lowercase().as_str() {
        "code_execution" | "code_interpreter" => Some(json!({"codeExecution": {}})),
        "google_search" => Some(json!({"googleSearch": {}})),
        other => {
            debug!(tool_hint = %other, "gemini has no declaration for tool hint; skipping");
            None
        }
    }
}

fn build_request(request: &ModelRequest) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: request.prompt.clone(),
    }];
    if let Some(image) = &request.image {
        parts.push(Part::Inline {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.to_base64(),
            },
        });
    }

    let mut tools: Vec<Value> = Vec::new();
    for declaration in request.tools.iter().filter_map(|hint| tool_declaration(hint)) {
        if !tools.contains(&declaration) {
            tools.push(declaration);
        }
    }

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config: GenerationConfig {
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
        },
        tools,
    }
}

pub async fn complete(client: &Client, cfg: &Config, request: &ModelRequest) -> Result<String> {
    let api_url = generate_url(&cfg.gemini_base_url, &request.model);
    let body = build_request(request);
    debug!(
        api_url = %api_url,
        model = %request.model,
        part_count = body.contents.iter().map(|c| c.parts.len()).sum::<usize>(),
        "sending gemini generateContent request"
    );

    let builder = client
        .post(&api_url)
        .query(&[("key", request.credentials.api_key.as_str())])
        .json(&body);
    let response = send(builder, &api_url, cfg.timeout_secs_for(Provider::Gemini)).await?;
    let parsed = read_json(response).await?;
    text_at(&parsed, "/candidates/0/content/parts/0/text")
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{build_request, complete, generate_url};
    use crate::config::Config;
    use crate::model::{Credentials, ImageAttachment, ModelRequest, SamplingParams};

    fn request() -> ModelRequest {
        ModelRequest {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            prompt: "Why does the compressor trip?".to_string(),
            sampling: SamplingParams {
                temperature: 0.2,
                top_p: 0.8,
            },
            tools: Vec::new(),
            streaming: false,
            image: None,
            credentials: Credentials {
                api_key: "gem-key".to_string(),
                ..Credentials::default()
            },
        }
    }

    #[test]
    fn generate_url_embeds_model() {
        assert_eq!(
            generate_url("https://generativelanguage.googleapis.com/", "gemini-pro"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn payload_maps_sampling_to_generation_config() {
        let payload = serde_json::to_value(build_request(&request())).expect("serializes");
        assert_eq!(
            payload,
            json!({
                "contents": [{"parts": [{"text": "Why does the compressor trip?"}]}],
                "generationConfig": {"temperature": 0.2, "topP": 0.8}
            })
        );
    }

    #[test]
    fn image_is_sent_as_inline_data() {
        let mut req = request();
        req.image = Some(ImageAttachment::new("image/webp", vec![9, 8, 7, 6]));
        let payload = serde_json::to_value(build_request(&req)).expect("serializes");

        let inline = &payload["contents"][0]["parts"][1]["inlineData"];
        assert_eq!(inline["mimeType"], "image/webp");
        let decoded = STANDARD
            .decode(inline["data"].as_str().expect("data is a string"))
            .expect("valid base64");
        assert_eq!(decoded, vec![9, 8, 7, 6]);
    }

    #[test]
    fn known_tool_hints_become_declarations() {
        let mut req = request();
        req.tools = vec![
            "code_interpreter".to_string(),
            "code_execution".to_string(),
            "google_search".to_string(),
            "dalle".to_string(),
        ];
        let payload = serde_json::to_value(build_request(&req)).expect("serializes");
        assert_eq!(
            payload["tools"],
            json!([{"codeExecution": {}}, {"googleSearch": {}}])
        );
    }

    #[test]
    fn chain_tool_ids_are_not_gemini_tool_hints() {
        let mut req = request();
        req.tools = vec!["retrieval".to_string(), "code".to_string()];
        let payload = serde_json::to_value(build_request(&req)).expect("serializes");
        assert!(payload.get("tools").is_none(), "unexpected tools: {payload}");
    }

    #[tokio::test]
    async fn complete_sends_key_as_query_and_reads_first_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "gem-key"))
            .and(body_partial_json(json!({"generationConfig": {"topP": 0.8}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Check the relay."}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = Config {
            gemini_base_url: server.uri(),
            ..Config::default()
        };
        let content = complete(&reqwest::Client::new(), &cfg, &request())
            .await
            .expect("gemini call should succeed");
        assert_eq!(content, "Check the relay.");
    }

    #[tokio::test]
    async fn complete_rejects_response_without_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"promptFeedback": {}})))
            .mount(&server)
            .await;

        let cfg = Config {
            gemini_base_url: server.uri(),
            ..Config::default()
        };
        let err = complete(&reqwest::Client::new(), &cfg, &request())
            .await
            .expect_err("missing candidates should fail");
        assert!(format!("{err:#}").contains("/candidates/0/content/parts/0/text"));
    }
}
