pub mod agent;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod model;
pub mod model_gateway;
pub mod providers;
pub mod repl;
pub mod retrieval;
pub mod usage_log;

use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use tracing::info;

use agent::chain::ChainRegistry;
use agent::{Agent, AgentRequest};
use config::Config;
use model::ImageAttachment;
use repl::run_repl;
use usage_log::UsageLog;

pub async fn run() -> Result<()> {
    let cfg = Config::from_env();
    info!(
        provider = %cfg.provider,
        model = %cfg.model,
        chain_mode = cfg.chain_mode.as_deref().unwrap_or("none"),
        tool_hints = cfg.tools.len(),
        streaming = cfg.stream,
        "loaded runtime configuration"
    );

    let registry = ChainRegistry::load(cfg.chains_path.as_deref())?;
    let image = cfg
        .image_path
        .as_deref()
        .map(ImageAttachment::from_path)
        .transpose()?;
    let usage_log = cfg.usage_log_path.clone().map(UsageLog::new);
    let client = Client::builder()
        .build()
        .context("Failed to initialize HTTP client")?;
    let agent = Agent::new(&client, &cfg, &registry);

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        run_repl(&agent, &cfg, image, usage_log.as_ref()).await
    } else {
        let request = AgentRequest::from_config(&cfg, args.join(" "), image);
        let answer = agent.respond(&request).await;
        if let Some(log) = &usage_log {
            log.record(&request, &answer);
        }
        println!("{}", answer.trim());
        Ok(())
    }
}
