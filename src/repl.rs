use anyhow::{Context, Result};
use std::io::{self, Write};

use crate::agent::chain::ChainRegistry;
use crate::agent::{Agent, AgentRequest};
use crate::catalog;
use crate::config::Config;
use crate::model::{ImageAttachment, Provider};
use crate::usage_log::UsageLog;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command<'a> {
    Quit,
    ShowChains,
    ShowModels,
    ShowSecrets,
    SetChain(Option<&'a str>),
    Prompt(&'a str),
}

fn parse_command(input: &str) -> Option<Command<'_>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
        return Some(Command::Quit);
    }
    if input.eq_ignore_ascii_case("/chains") {
        return Some(Command::ShowChains);
    }
    if input.eq_ignore_ascii_case("/models") {
        return Some(Command::ShowModels);
    }
    if input.eq_ignore_ascii_case("/secrets") {
        return Some(Command::ShowSecrets);
    }
    if let Some(rest) = input.strip_prefix("/chain") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let name = rest.trim();
            return Some(Command::SetChain(match name {
                "" | "off" | "none" => None,
                other => Some(other),
            }));
        }
    }
    Some(Command::Prompt(input))
}

pub async fn run_repl(
    agent: &Agent<'_>,
    cfg: &Config,
    image: Option<ImageAttachment>,
    usage_log: Option<&UsageLog>,
) -> Result<()> {
    let mut chain_mode = cfg.chain_mode.clone();

    println!("chatterfix agent");
    println!(
        "provider: {}  model: {} ({})",
        cfg.provider,
        cfg.model,
        catalog::describe(&cfg.provider, &cfg.model)
    );
    if let Some(note) = unlisted_model_note(&cfg.provider, &cfg.model) {
        println!("{note}");
    }
    println!(
        "type a prompt, '/chain <name>' or '/chain off', '/chains', '/models', '/secrets', or 'exit' to quit"
    );

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read stdin")?;
        if read == 0 {
            break;
        }

        match parse_command(&input) {
            None => continue,
            Some(Command::Quit) => break,
            Some(Command::ShowChains) => print_chains(agent.registry(), chain_mode.as_deref()),
            Some(Command::ShowModels) => print_models(cfg),
            Some(Command::ShowSecrets) => print_secrets(cfg),
            Some(Command::SetChain(name)) => {
                chain_mode = name.map(str::to_string);
                match &chain_mode {
                    Some(name) if agent.registry().lookup(name).is_none() => println!(
                        "chain '{name}' is not registered; prompts will use a single model call\n"
                    ),
                    Some(name) => println!("chain set to '{name}'\n"),
                    None => println!("chaining off\n"),
                }
            }
            Some(Command::Prompt(prompt)) => {
                let mut request = AgentRequest::from_config(cfg, prompt, image.clone());
                request.chain_mode = chain_mode.clone();
                let answer = agent.respond(&request).await;
                if let Some(log) = usage_log {
                    log.record(&request, &answer);
                }
                println!("{}\n", answer.trim());
            }
        }
    }

    Ok(())
}

fn print_chains(registry: &ChainRegistry, active: Option<&str>) {
    for chain in registry.chains() {
        let marker = if Some(chain.name()) == active { "*" } else { " " };
        println!("{} {}: {}", marker, chain.name(), chain.steps().join(" -> "));
    }
    println!();
}

/// Suggests a preset when the configured model is not one the catalog lists.
fn unlisted_model_note(provider: &str, model: &str) -> Option<String> {
    if catalog::describe(provider, model) != catalog::UNKNOWN_MODEL_DESCRIPTION {
        return None;
    }
    catalog::fallback_model(provider, model)
        .map(|preset| format!("'{model}' is not a listed {provider} preset; try MODEL={preset}"))
}

fn print_models(cfg: &Config) {
    for provider in Provider::ALL {
        println!("{}:", provider.label());
        for preset in catalog::presets(provider) {
            println!("  {} – {}", preset.id, preset.description);
        }
    }
    if let Some(note) = unlisted_model_note(&cfg.provider, &cfg.model) {
        println!("{note}");
    }
    println!();
}

fn print_secrets(cfg: &Config) {
    for status in cfg.secret_status() {
        let state = if status.is_set { "✅" } else { "⚠️ MISSING" };
        println!(" - {}: {}", status.name, state);
    }
    println!();
}
