use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::agent::AgentRequest;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    pub timestamp: String,
    pub provider: String,
    pub model: String,
    pub chain: Option<String>,
    pub prompt: String,
    pub response: String,
}

impl UsageRecord {
    pub fn new(request: &AgentRequest, response: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            provider: request.provider.clone(),
            model: request.model.clone(),
            chain: request.chain_mode.clone(),
            prompt: request.prompt.clone(),
            response: response.to_string(),
        }
    }
}

/// Append-only JSON-lines log of answered prompts.
#[derive(Debug, Clone)]
pub struct UsageLog {
    path: PathBuf,
}

impl UsageLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &UsageRecord) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create '{}'", dir.display()))?;
        }
        let mut line = serde_json::to_string(record).context("Failed to encode usage record")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open usage log '{}'", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write usage log '{}'", self.path.display()))?;
        debug!(path = %self.path.display(), "appended usage record");
        Ok(())
    }

    /// Logging is best-effort; a failure is reported and otherwise ignored.
    pub fn record(&self, request: &AgentRequest, response: &str) {
        if let Err(err) = self.append(&UsageRecord::new(request, response)) {
            warn!(path = %self.path.display(), error = %format!("{err:#}"), "usage logging failed");
        }
    }
}
