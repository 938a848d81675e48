//! Informational model presets per provider. Nothing here affects dispatch.

use crate::model::Provider;

pub const UNKNOWN_MODEL_DESCRIPTION: &str = "🔍 Custom or unknown model.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPreset {
    pub id: &'static str,
    pub description: &'static str,
}

const OPENAI_PRESETS: &[ModelPreset] = &[
    ModelPreset {
        id: "gpt-4-0125-preview",
        description: "Most powerful GPT-4 model for reasoning and code.",
    },
    ModelPreset {
        id: "gpt-3.5-turbo",
        description: "Fast, cheap, and lightweight for most tasks.",
    },
];

const GEMINI_PRESETS: &[ModelPreset] = &[
    ModelPreset {
        id: "gemini-pro",
        description: "Google's Gemini Pro (v1) - basic flagship model.",
    },
    ModelPreset {
        id: "gemini-1.5-pro",
        description: "Gemini 1.5 Pro - strong reasoning and multi-modal support.",
    },
    ModelPreset {
        id: "gemini-1.5-flash",
        description: "Gemini 1.5 Flash - optimized for speed and low latency.",
    },
];

const HUGGINGFACE_PRESETS: &[ModelPreset] = &[
    ModelPreset {
        id: "mistralai/Mistral-7B-Instruct-v0.2",
        description: "7B open-weight model for coding and QA.",
    },
    ModelPreset {
        id: "meta-llama/Llama-2-13b-chat-hf",
        description: "LLaMA 2 model fine-tuned for chat.",
    },
];

const CUSTOM_PRESETS: &[ModelPreset] = &[ModelPreset {
    id: "your-model-id",
    description: "Your custom endpoint model.",
}];

pub fn presets(provider: Provider) -> &'static [ModelPreset] {
    match provider {
        Provider::OpenAi => OPENAI_PRESETS,
        Provider::Gemini => GEMINI_PRESETS,
        Provider::HuggingFace => HUGGINGFACE_PRESETS,
        Provider::Custom => CUSTOM_PRESETS,
    }
}

pub fn describe(provider: &str, model_id: &str) -> &'static str {
    Provider::parse(provider)
        .and_then(|provider| presets(provider).iter().find(|preset| preset.id == model_id))
        .map(|preset| preset.description)
        .unwrap_or(UNKNOWN_MODEL_DESCRIPTION)
}

/// First preset of `provider` other than `failed_model`.
pub fn fallback_model(provider: &str, failed_model: &str) -> Option<&'static str> {
    let provider = Provider::parse(provider)?;
    presets(provider)
        .iter()
        .map(|preset| preset.id)
        .find(|id| *id != failed_model)
}

#[cfg(test)]
mod tests {
    use super::{UNKNOWN_MODEL_DESCRIPTION, describe, fallback_model, presets};
    use crate::model::Provider;

    #[test]
    fn every_provider_has_presets() {
        for provider in Provider::ALL {
            assert!(!presets(provider).is_empty(), "{provider} has no presets");
        }
    }

    #[test]
    fn describe_known_and_unknown_models() {
        assert_eq!(
            describe("OpenAI", "gpt-3.5-turbo"),
            "Fast, cheap, and lightweight for most tasks."
        );
        assert_eq!(describe("openai", "gpt-9"), UNKNOWN_MODEL_DESCRIPTION);
        assert_eq!(describe("nope", "gpt-3.5-turbo"), UNKNOWN_MODEL_DESCRIPTION);
    }

    #[test]
    fn fallback_skips_the_failed_model() {
        assert_eq!(
            fallback_model("gemini", "gemini-pro"),
            Some("gemini-1.5-pro")
        );
        assert_eq!(
            fallback_model("gemini", "gemini-1.5-flash"),
            Some("gemini-pro")
        );
        assert_eq!(fallback_model("custom", "your-model-id"), None);
        assert_eq!(fallback_model("unknown", "x"), None);
    }
}
