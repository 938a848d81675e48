use thiserror::Error;
use tracing::{debug, info, warn};

use super::AgentRequest;
use super::chain::{ChainRegistry, ToolStep};
use super::memory::RunMemory;
use super::tools::ToolAdapter;
use crate::model_gateway::ModelGateway;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Unknown tool: '{tool}' in chain '{chain}'")]
    UnknownTool { chain: String, tool: String },
}

/// Runs a request through its configured chain, or through a single model call
/// when no chain matches.
pub struct Orchestrator<'a> {
    registry: &'a ChainRegistry,
    gateway: &'a dyn ModelGateway,
    retrieval: &'a dyn ToolAdapter,
    code_analysis: &'a dyn ToolAdapter,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        registry: &'a ChainRegistry,
        gateway: &'a dyn ModelGateway,
        retrieval: &'a dyn ToolAdapter,
        code_analysis: &'a dyn ToolAdapter,
    ) -> Self {
        Self {
            registry,
            gateway,
            retrieval,
            code_analysis,
        }
    }

    pub async fn run(
        &self,
        request: &AgentRequest,
        memory: &mut RunMemory,
    ) -> Result<String, ChainError> {
        let chain = request
            .chain_mode
            .as_deref()
            .and_then(|name| self.registry.lookup(name));

        let Some(chain) = chain else {
            if let Some(name) = &request.chain_mode {
                debug!(chain = %name, "chain not registered; using single model call");
            }
            let response = self
                .gateway
                .invoke(&request.model_request(request.prompt.clone()))
                .await;
            return Ok(response.content);
        };

        info!(chain = %chain.name(), step_count = chain.steps().len(), "running chain");
        let mut current_input = request.prompt.clone();
        for (position, tool) in chain.steps().iter().enumerate() {
            let Some(step) = ToolStep::parse(tool) else {
                warn!(chain = %chain.name(), tool = %tool, position, "unknown tool in chain");
                return Err(ChainError::UnknownTool {
                    chain: chain.name().to_string(),
                    tool: tool.clone(),
                });
            };

            let output = self
                .execute_step(step, &current_input, memory, request)
                .await;
            debug!(
                chain = %chain.name(),
                step = %step,
                position,
                output_len = output.len(),
                "chain step finished"
            );
            memory.record(step, output.clone());
            current_input = output;
        }

        Ok(memory
            .get(ToolStep::ModelInference)
            .map(str::to_owned)
            .unwrap_or(current_input))
    }

    async fn execute_step(
        &self,
        step: ToolStep,
        input: &str,
        memory: &RunMemory,
        request: &AgentRequest,
    ) -> String {
        let adapter = match step {
            ToolStep::Retrieval => self.retrieval,
            ToolStep::CodeAnalysis => self.code_analysis,
            ToolStep::ModelInference => {
                let prompt = memory.augment_prompt(input);
                let response = self.gateway.invoke(&request.model_request(prompt)).await;
                return response.content;
            }
        };

        match adapter.execute(input).await {
            Ok(output) => output.content,
            Err(err) => {
                warn!(step = %step, error = %err, "tool step failed");
                format!("❌ {} Error: {err}", step.label())
            }
        }
    }
}
