pub mod chain;
pub mod memory;
pub mod orchestrator;
pub mod tools;

use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::model::{Credentials, ImageAttachment, ModelRequest, Provider, SamplingParams};
use crate::model_gateway::HostModelGateway;
use crate::retrieval::OpenAiEmbedder;

use chain::ChainRegistry;
use memory::RunMemory;
use orchestrator::Orchestrator;
use tools::{CodeAnalysisTool, RetrievalTool};

/// Everything one user action asks for. Built fresh per action and only read
/// afterwards.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub model: String,
    pub provider: String,
    pub credentials: Credentials,
    pub sampling: SamplingParams,
    pub tools: Vec<String>,
    pub streaming: bool,
    pub image: Option<ImageAttachment>,
    pub chain_mode: Option<String>,
}

impl AgentRequest {
    pub fn from_config(
        cfg: &Config,
        prompt: impl Into<String>,
        image: Option<ImageAttachment>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: cfg.model.clone(),
            provider: cfg.provider.clone(),
            credentials: cfg.credentials_for(&cfg.provider),
            sampling: cfg.sampling,
            tools: cfg.tools.clone(),
            streaming: cfg.stream,
            image,
            chain_mode: cfg.chain_mode.clone(),
        }
    }

    /// The single-call view of this request with `prompt` substituted. Chain
    /// selection is not carried over.
    pub fn model_request(&self, prompt: String) -> ModelRequest {
        ModelRequest {
            provider: self.provider.clone(),
            model: self.model.clone(),
            prompt,
            sampling: self.sampling,
            tools: self.tools.clone(),
            streaming: self.streaming,
            image: self.image.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

/// Production wiring: provider gateway, index-backed retrieval and the
/// configured code-analysis endpoint.
pub struct Agent<'a> {
    registry: &'a ChainRegistry,
    gateway: HostModelGateway<'a>,
    retrieval: RetrievalTool<OpenAiEmbedder<'a>>,
    code_analysis: CodeAnalysisTool<'a>,
}

impl<'a> Agent<'a> {
    pub fn new(client: &'a Client, cfg: &'a Config, registry: &'a ChainRegistry) -> Self {
        let embedder = OpenAiEmbedder::new(
            client,
            &cfg.openai_base_url,
            &cfg.openai_api_key,
            &cfg.retrieval.embedding_model,
            cfg.timeout_secs_for(Provider::OpenAi),
        );
        Self {
            registry,
            gateway: HostModelGateway::new(client, cfg),
            retrieval: RetrievalTool::new(
                embedder,
                cfg.retrieval.index_path.clone(),
                cfg.retrieval.top_k,
            ),
            code_analysis: CodeAnalysisTool::new(
                client,
                &cfg.code_analysis.url,
                &cfg.code_analysis.auth_header,
                cfg.tool_timeout_secs,
            ),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        self.registry
    }

    fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(
            self.registry,
            &self.gateway,
            &self.retrieval,
            &self.code_analysis,
        )
    }

    /// Runs `request` with a fresh memory.
    pub async fn respond(&self, request: &AgentRequest) -> String {
        let mut memory = RunMemory::new();
        self.respond_with_memory(request, &mut memory).await
    }

    /// Always yields displayable text; a run-ending chain error is rendered inline.
    pub async fn respond_with_memory(
        &self,
        request: &AgentRequest,
        memory: &mut RunMemory,
    ) -> String {
        match self.orchestrator().run(request, memory).await {
            Ok(answer) => answer,
            Err(err) => {
                debug!(error = %err, "chain run failed");
                format!("❌ {err}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Agent, AgentRequest};
    use crate::agent::chain::{ChainDefinition, ChainRegistry};
    use crate::config::Config;
    use crate::model::ImageAttachment;

    fn config() -> Config {
        Config {
            provider: "Gemini".to_string(),
            model: "gemini-pro".to_string(),
            chain_mode: Some("doc_qa_chain".to_string()),
            gemini_api_key: "gem-key".to_string(),
            tools: vec!["code_execution".to_string()],
            stream: true,
            ..Config::default()
        }
    }

    #[test]
    fn from_config_selects_provider_credentials() {
        let image = ImageAttachment::new("image/png", vec![1, 2, 3]);
        let request = AgentRequest::from_config(&config(), "why?", Some(image.clone()));

        assert_eq!(request.prompt, "why?");
        assert_eq!(request.provider, "Gemini");
        assert_eq!(request.credentials.api_key, "gem-key");
        assert_eq!(request.chain_mode.as_deref(), Some("doc_qa_chain"));
        assert_eq!(request.image, Some(image));
        assert!(request.streaming);
    }

    #[test]
    fn model_request_copies_everything_but_the_prompt() {
        let request = AgentRequest::from_config(&config(), "original", None);
        let inner = request.model_request("augmented".to_string());

        assert_eq!(inner.prompt, "augmented");
        assert_eq!(inner.provider, request.provider);
        assert_eq!(inner.model, request.model);
        assert_eq!(inner.tools, request.tools);
        assert_eq!(inner.credentials, request.credentials);
        assert_eq!(inner.sampling, request.sampling);
        assert!(inner.streaming);
    }

    #[tokio::test]
    async fn respond_renders_unknown_tool_inline() {
        let client = reqwest::Client::new();
        let cfg = Config::default();
        let mut registry = ChainRegistry::empty();
        registry.insert(ChainDefinition::new(
            "typo",
            vec!["modle".to_string(), "model".to_string()],
        ));
        let agent = Agent::new(&client, &cfg, &registry);
        let mut request = AgentRequest::from_config(&cfg, "hello", None);
        request.chain_mode = Some("typo".to_string());

        let answer = agent.respond(&request).await;
        assert_eq!(answer, "❌ Unknown tool: 'modle' in chain 'typo'");
    }

    #[tokio::test]
    async fn respond_with_unsupported_provider_returns_warning_text() {
        let client = reqwest::Client::new();
        let cfg = Config {
            provider: "watsonx".to_string(),
            ..Config::default()
        };
        let registry = ChainRegistry::builtin();
        let agent = Agent::new(&client, &cfg, &registry);

        let answer = agent
            .respond(&AgentRequest::from_config(&cfg, "hello", None))
            .await;
        assert!(answer.starts_with("⚠️ Unsupported provider 'watsonx'"));
        assert!(agent.registry().lookup("doc_qa_chain").is_some());
    }
}
