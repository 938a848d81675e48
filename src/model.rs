use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::Config;
use crate::providers;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 1.0;
const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Gemini,
    HuggingFace,
    Custom,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Gemini,
        Provider::HuggingFace,
        Provider::Custom,
    ];

    /// Accepts the canonical ids as well as the display labels, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" => Some(Self::Gemini),
            "huggingface" | "hf" => Some(Self::HuggingFace),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::HuggingFace => "huggingface",
            Self::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Gemini => "Gemini",
            Self::HuggingFace => "HuggingFace",
            Self::Custom => "Custom",
        }
    }

    pub fn default_timeout_secs(&self) -> u64 {
        match self {
            Self::OpenAi | Self::Gemini => 30,
            Self::HuggingFace | Self::Custom => 20,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
}

impl SamplingParams {
    /// Returns `None` unless `temperature` is in `[0, 2]` and `top_p` in `(0, 1]`.
    pub fn new(temperature: f64, top_p: f64) -> Option<Self> {
        if is_valid_temperature(temperature) && is_valid_top_p(top_p) {
            Some(Self { temperature, top_p })
        } else {
            None
        }
    }
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
        }
    }
}

pub(crate) fn is_valid_temperature(value: f64) -> bool {
    (0.0..=2.0).contains(&value)
}

pub(crate) fn is_valid_top_p(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAttachment {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read image '{}'", path.display()))?;
        Ok(Self::new(mime_type_for_path(path), bytes))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn mime_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => DEFAULT_IMAGE_MIME_TYPE,
    }
}

/// Per-provider secrets. `Debug` never prints the values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub endpoint_url: String,
    pub auth_header: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key_set", &!self.api_key.is_empty())
            .field("endpoint_url", &self.endpoint_url)
            .field("auth_header_set", &!self.auth_header.is_empty())
            .finish()
    }
}

/// A single model call. Carries no chain selection, so a call built from this
/// type can never re-enter chain execution.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub provider: String,
    pub model: String,
    pub prompt: String,
    pub sampling: SamplingParams,
    pub tools: Vec<String>,
    pub streaming: bool,
    pub image: Option<ImageAttachment>,
    pub credentials: Credentials,
}

pub fn unsupported_provider_text(provider: &str) -> String {
    let supported: Vec<&str> = Provider::ALL.iter().map(Provider::as_str).collect();
    format!(
        "⚠️ Unsupported provider '{}'. Supported providers: {}.",
        provider,
        supported.join(", ")
    )
}

/// Sends one request to the selected provider. Every failure comes back as
/// displayable text prefixed with a severity glyph.
pub async fn invoke(client: &Client, cfg: &Config, request: &ModelRequest) -> String {
    let Some(provider) = Provider::parse(&request.provider) else {
        warn!(provider = %request.provider, "unsupported model provider requested");
        return unsupported_provider_text(&request.provider);
    };

    debug!(
        provider = %provider,
        model = %request.model,
        prompt_len = request.prompt.len(),
        has_image = request.image.is_some(),
        tool_hints = request.tools.len(),
        streaming = request.streaming,
        "dispatching model request"
    );

    let result = match provider {
        Provider::OpenAi => providers::openai::complete(client, cfg, request).await,
        Provider::Gemini => providers::gemini::complete(client, cfg, request).await,
        Provider::HuggingFace => providers::huggingface::complete(client, cfg, request).await,
        Provider::Custom => {
            if request.credentials.endpoint_url.trim().is_empty() {
                warn!("custom provider selected without CUSTOM_API_URL");
                return "❌ Custom API URL not set.".to_string();
            }
            providers::custom::complete(client, cfg, request).await
        }
    };

    match result {
        Ok(content) => content,
        Err(err) => {
            warn!(
                provider = %provider,
                model = %request.model,
                error = %format!("{err:#}"),
                "model request failed"
            );
            format!("❌ {} API Error: {err:#}", provider.label())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{
        Credentials, ImageAttachment, ModelRequest, Provider, SamplingParams, invoke,
        mime_type_for_path, unsupported_provider_text,
    };
    use crate::config::Config;

    fn request(provider: &str) -> ModelRequest {
        ModelRequest {
            provider: provider.to_string(),
            model: "some-model".to_string(),
            prompt: "hello".to_string(),
            sampling: SamplingParams::default(),
            tools: Vec::new(),
            streaming: false,
            image: None,
            credentials: Credentials::default(),
        }
    }

    #[test]
    fn provider_parse_accepts_ids_and_labels() {
        assert_eq!(Provider::parse("OpenAI"), Some(Provider::OpenAi));
        assert_eq!(Provider::parse(" gemini "), Some(Provider::Gemini));
        assert_eq!(Provider::parse("HuggingFace"), Some(Provider::HuggingFace));
        assert_eq!(Provider::parse("hf"), Some(Provider::HuggingFace));
        assert_eq!(Provider::parse("CUSTOM"), Some(Provider::Custom));
        assert_eq!(Provider::parse("anthropic"), None);
        assert_eq!(Provider::parse(""), None);
    }

    #[test]
    fn provider_ids_round_trip_through_parse() {
        for provider in Provider::ALL {
            assert_eq!(Provider::parse(provider.as_str()), Some(provider));
            assert_eq!(Provider::parse(provider.label()), Some(provider));
        }
    }

    #[test]
    fn sampling_params_reject_out_of_range_values() {
        assert!(SamplingParams::new(0.0, 1.0).is_some());
        assert!(SamplingParams::new(2.0, 0.01).is_some());
        assert!(SamplingParams::new(2.1, 1.0).is_none());
        assert!(SamplingParams::new(-0.1, 1.0).is_none());
        assert!(SamplingParams::new(0.7, 0.0).is_none());
        assert!(SamplingParams::new(0.7, 1.5).is_none());
    }

    #[test]
    fn image_data_uri_uses_mime_type_and_base64() {
        let image = ImageAttachment::new("image/png", b"abc".to_vec());
        assert_eq!(image.data_uri(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_type_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for_path(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_type_for_path(Path::new("noext")), "image/jpeg");
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = Credentials {
            api_key: "sk-secret".to_string(),
            endpoint_url: String::new(),
            auth_header: "Bearer hidden".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("hidden"));
    }

    #[tokio::test]
    async fn invoke_returns_text_for_unsupported_provider() {
        let client = reqwest::Client::new();
        let cfg = Config::default();
        let text = invoke(&client, &cfg, &request("mystery-llm")).await;
        assert_eq!(text, unsupported_provider_text("mystery-llm"));
        assert!(text.starts_with("⚠️"));
        assert!(text.contains("openai, gemini, huggingface, custom"));
    }

    #[tokio::test]
    async fn invoke_reports_missing_custom_url() {
        let client = reqwest::Client::new();
        let cfg = Config::default();
        let text = invoke(&client, &cfg, &request("custom")).await;
        assert_eq!(text, "❌ Custom API URL not set.");
    }
}
