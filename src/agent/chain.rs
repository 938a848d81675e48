use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolStep {
    Retrieval,
    CodeAnalysis,
    ModelInference,
}

impl ToolStep {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "retrieval" => Some(Self::Retrieval),
            "code" => Some(Self::CodeAnalysis),
            "model" => Some(Self::ModelInference),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieval => "retrieval",
            Self::CodeAnalysis => "code",
            Self::ModelInference => "model",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Retrieval => "Retrieval",
            Self::CodeAnalysis => "Code Analysis",
            Self::ModelInference => "Model",
        }
    }
}

impl fmt::Display for ToolStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Steps stay as raw identifiers so a misconfigured chain is reported when it
/// runs rather than silently dropped at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDefinition {
    name: String,
    steps: Vec<String>,
}

impl ChainDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

const BUILTIN_CHAINS: &[(&str, &[&str])] = &[
    ("doc_qa_chain", &["retrieval", "model"]),
    ("code_first_chain", &["code", "model"]),
    ("deep_analysis", &["retrieval", "code", "model"]),
    ("custom_chain_example", &["retrieval", "model", "retrieval"]),
];

const BUILTIN_TOOL_SCORES: &[(&str, f64)] = &[("retrieval", 0.9), ("code", 0.8), ("model", 1.0)];

/// Chain name to ordered tool list. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRegistry {
    chains: BTreeMap<String, ChainDefinition>,
    tool_scores: BTreeMap<String, f64>,
}

impl ChainRegistry {
    pub fn empty() -> Self {
        Self {
            chains: BTreeMap::new(),
            tool_scores: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, steps) in BUILTIN_CHAINS {
            registry.insert(ChainDefinition::new(
                *name,
                steps.iter().map(|step| step.to_string()).collect(),
            ));
        }
        registry.tool_scores = BUILTIN_TOOL_SCORES
            .iter()
            .map(|(tool, score)| (tool.to_string(), *score))
            .collect();
        registry
    }

    /// Built-in chains, overlaid with the JSON object at `overrides_path` when given.
    pub fn load(overrides_path: Option<&Path>) -> Result<Self> {
        let mut registry = Self::builtin();
        if let Some(path) = overrides_path {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read chain definitions '{}'", path.display()))?;
            let merged = registry
                .merge_json(&raw)
                .with_context(|| format!("Invalid chain definitions in '{}'", path.display()))?;
            info!(path = %path.display(), chain_count = merged, "loaded chain definitions");
        }
        Ok(registry)
    }

    /// Merges `{"name": ["tool", ...]}`; same-named chains are replaced.
    pub fn merge_json(&mut self, raw: &str) -> Result<usize> {
        let parsed: BTreeMap<String, Vec<String>> =
            serde_json::from_str(raw).context("Expected an object of chain name to tool list")?;
        let count = parsed.len();
        for (name, steps) in parsed {
            debug!(chain = %name, steps = ?steps, "registering chain");
            self.insert(ChainDefinition::new(name, steps));
        }
        Ok(count)
    }

    pub fn insert(&mut self, chain: ChainDefinition) {
        self.chains.insert(chain.name.clone(), chain);
    }

    pub fn lookup(&self, name: &str) -> Option<&ChainDefinition> {
        self.chains.get(name)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainDefinition> {
        self.chains.values()
    }

    /// Ranking weight for a tool. Execution order never consults it.
    pub fn tool_score(&self, tool: &str) -> Option<f64> {
        self.tool_scores.get(tool).copied()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
