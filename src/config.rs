use std::env;
use std::path::PathBuf;

use crate::model::{
    Credentials, DEFAULT_TEMPERATURE, DEFAULT_TOP_P, Provider, SamplingParams,
    is_valid_temperature, is_valid_top_p,
};

const DEFAULT_MODEL_PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4-0125-preview";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_HUGGINGFACE_BASE_URL: &str = "https://api-inference.huggingface.co";
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIEVAL_INDEX_PATH: &str = "vector_index/index.json";
const DEFAULT_RETRIEVAL_TOP_K: usize = 5;
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalSettings {
    pub index_path: PathBuf,
    pub top_k: usize,
    pub embedding_model: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from(DEFAULT_RETRIEVAL_INDEX_PATH),
            top_k: DEFAULT_RETRIEVAL_TOP_K,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeAnalysisSettings {
    pub url: String,
    pub auth_header: String,
}

#[derive(Clone)]
pub struct Config {
    pub provider: String,
    pub model: String,
    pub chain_mode: Option<String>,
    pub sampling: SamplingParams,
    pub tools: Vec<String>,
    pub stream: bool,
    pub image_path: Option<PathBuf>,
    pub model_timeout_secs: Option<u64>,
    pub tool_timeout_secs: u64,
    pub openai_api_key: String,
    pub gemini_api_key: String,
    pub huggingface_api_key: String,
    pub custom_api_url: String,
    pub custom_auth_header: String,
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub huggingface_base_url: String,
    pub retrieval: RetrievalSettings,
    pub code_analysis: CodeAnalysisSettings,
    pub chains_path: Option<PathBuf>,
    pub usage_log_path: Option<PathBuf>,
}

/// Whether a secret is present, for display without revealing the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretStatus {
    pub name: &'static str,
    pub is_set: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    fn from_env_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Self {
        let temperature = parse_temperature(get_var("TEMPERATURE").as_deref());
        let top_p = parse_top_p(get_var("TOP_P").as_deref());
        let retrieval = RetrievalSettings {
            index_path: parse_optional_path(get_var("RETRIEVAL_INDEX_PATH").as_deref())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RETRIEVAL_INDEX_PATH)),
            top_k: parse_positive_usize(
                get_var("RETRIEVAL_TOP_K").as_deref(),
                DEFAULT_RETRIEVAL_TOP_K,
            ),
            embedding_model: parse_non_empty(get_var("EMBEDDING_MODEL"))
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        };
        let code_analysis = CodeAnalysisSettings {
            url: get_var("CODE_ANALYSIS_URL").unwrap_or_default(),
            auth_header: get_var("CODE_ANALYSIS_AUTH").unwrap_or_default(),
        };

        Self {
            provider: parse_non_empty(get_var("MODEL_PROVIDER"))
                .unwrap_or_else(|| DEFAULT_MODEL_PROVIDER.to_string()),
            model: parse_non_empty(get_var("MODEL")).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            chain_mode: parse_non_empty(get_var("CHAIN_MODE")),
            sampling: SamplingParams { temperature, top_p },
            tools: parse_tool_hints(get_var("TOOLS").as_deref()),
            stream: parse_bool(get_var("STREAM").as_deref(), false),
            image_path: parse_optional_path(get_var("IMAGE_PATH").as_deref()),
            model_timeout_secs: parse_optional_positive_u64(
                get_var("MODEL_TIMEOUT_SECS").as_deref(),
            ),
            tool_timeout_secs: parse_optional_positive_u64(get_var("TOOL_TIMEOUT_SECS").as_deref())
                .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
            openai_api_key: get_var("OPENAI_API_KEY").unwrap_or_default(),
            gemini_api_key: get_var("GEMINI_API_KEY").unwrap_or_default(),
            huggingface_api_key: get_var("HUGGINGFACE_API_KEY").unwrap_or_default(),
            custom_api_url: get_var("CUSTOM_API_URL").unwrap_or_default(),
            custom_auth_header: get_var("CUSTOM_AUTH_HEADER").unwrap_or_default(),
            openai_base_url: parse_non_empty(get_var("OPENAI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            gemini_base_url: parse_non_empty(get_var("GEMINI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            huggingface_base_url: parse_non_empty(get_var("HUGGINGFACE_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_HUGGINGFACE_BASE_URL.to_string()),
            retrieval,
            code_analysis,
            chains_path: parse_optional_path(get_var("CHAINS_PATH").as_deref()),
            usage_log_path: parse_optional_path(get_var("USAGE_LOG_PATH").as_deref()),
        }
    }

    /// Secrets for `provider`; unknown providers get empty credentials.
    pub fn credentials_for(&self, provider: &str) -> Credentials {
        match Provider::parse(provider) {
            Some(Provider::OpenAi) => Credentials {
                api_key: self.openai_api_key.clone(),
                ..Credentials::default()
            },
            Some(Provider::Gemini) => Credentials {
                api_key: self.gemini_api_key.clone(),
                ..Credentials::default()
            },
            Some(Provider::HuggingFace) => Credentials {
                api_key: self.huggingface_api_key.clone(),
                ..Credentials::default()
            },
            Some(Provider::Custom) => Credentials {
                api_key: String::new(),
                endpoint_url: self.custom_api_url.clone(),
                auth_header: self.custom_auth_header.clone(),
            },
            None => Credentials::default(),
        }
    }

    pub fn timeout_secs_for(&self, provider: Provider) -> u64 {
        self.model_timeout_secs
            .unwrap_or_else(|| provider.default_timeout_secs())
    }

    pub fn secret_status(&self) -> Vec<SecretStatus> {
        [
            ("OPENAI_API_KEY", &self.openai_api_key),
            ("GEMINI_API_KEY", &self.gemini_api_key),
            ("HUGGINGFACE_API_KEY", &self.huggingface_api_key),
            ("CUSTOM_AUTH_HEADER", &self.custom_auth_header),
            ("CUSTOM_API_URL", &self.custom_api_url),
            ("CODE_ANALYSIS_URL", &self.code_analysis.url),
        ]
        .into_iter()
        .map(|(name, value)| SecretStatus {
            name,
            is_set: !value.trim().is_empty(),
        })
        .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env_with(|_| None)
    }
}

fn parse_non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_optional_path(raw: Option<&str>) -> Option<PathBuf> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn parse_optional_positive_u64(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn parse_positive_usize(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_temperature(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| is_valid_temperature(*value))
        .unwrap_or(DEFAULT_TEMPERATURE)
}

fn parse_top_p(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| is_valid_top_p(*value))
        .unwrap_or(DEFAULT_TOP_P)
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    match raw.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

fn parse_tool_hints(raw: Option<&str>) -> Vec<String> {
    let mut hints: Vec<String> = Vec::new();
    for hint in raw.unwrap_or_default().split(',') {
        let hint = hint.trim();
        if !hint.is_empty() && !hints.iter().any(|existing| existing == hint) {
            hints.push(hint.to_string());
        }
    }
    hints
}
