//! Backend selection from the environment.

use std::str::FromStr;
use std::sync::Arc;

use agent_core::error::{AgentError, Result};
use agent_core::provider::LlmProvider;

use crate::huggingface::{HuggingFaceConfig, HuggingFaceProvider};
use crate::Lookup;

/// Model used with Ollama when `AGENT_MODEL` is unset
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Value of `LLM_PROVIDER`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProviderChoice {
    /// Hugging Face when a token is present, otherwise Ollama
    #[default]
    Auto,
    Ollama,
    HuggingFace,
}

impl FromStr for ProviderChoice {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "ollama" => Ok(Self::Ollama),
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            other => Err(AgentError::Config(format!(
                "unknown LLM_PROVIDER '{other}' (expected auto, ollama or huggingface)"
            ))),
        }
    }
}

/// Concrete backend after resolving [`ProviderChoice::Auto`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Ollama,
    HuggingFace,
}

impl ProviderChoice {
    pub fn resolve(self, has_hf_token: bool) -> Backend {
        match self {
            Self::Ollama => Backend::Ollama,
            Self::HuggingFace => Backend::HuggingFace,
            Self::Auto if has_hf_token => Backend::HuggingFace,
            Self::Auto => Backend::Ollama,
        }
    }
}

/// The chosen provider and the model name to request from it
pub struct SelectedProvider {
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
}

impl std::fmt::Debug for SelectedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedProvider")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

pub fn select_provider() -> Result<SelectedProvider> {
    select_provider_with(&crate::process_env)
}

pub fn select_provider_with(lookup: &Lookup<'_>) -> Result<SelectedProvider> {
    let choice: ProviderChoice = lookup("LLM_PROVIDER")
        .map(|s| s.parse::<ProviderChoice>())
        .transpose()?
        .unwrap_or_default();
    let has_token = lookup("HF_TOKEN").is_some_and(|t| !t.trim().is_empty());

    let selected = match choice.resolve(has_token) {
        Backend::HuggingFace => {
            let config = HuggingFaceConfig::from_lookup(lookup)?;
            SelectedProvider {
                provider: Arc::new(HuggingFaceProvider::from_config(&config)?),
                model: config.model,
            }
        }
        Backend::Ollama => ollama_provider(lookup)?,
    };

    tracing::info!(provider = selected.provider.name(), model = %selected.model, "Model backend selected");
    Ok(selected)
}

fn agent_model(lookup: &Lookup<'_>) -> String {
    lookup("AGENT_MODEL")
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.into())
}

#[cfg(feature = "ollama")]
fn ollama_provider(lookup: &Lookup<'_>) -> Result<SelectedProvider> {
    let config = crate::ollama::OllamaConfig::from_lookup(lookup);
    Ok(SelectedProvider {
        provider: Arc::new(crate::ollama::OllamaProvider::from_config(config)),
        model: agent_model(lookup),
    })
}

#[cfg(not(feature = "ollama"))]
fn ollama_provider(lookup: &Lookup<'_>) -> Result<SelectedProvider> {
    let _ = agent_model(lookup);
    Err(AgentError::Config(
        "the Ollama backend is not compiled in; set HF_TOKEN or enable the `ollama` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!("auto".parse::<ProviderChoice>().unwrap(), ProviderChoice::Auto);
        assert_eq!("Ollama".parse::<ProviderChoice>().unwrap(), ProviderChoice::Ollama);
        assert_eq!("hf".parse::<ProviderChoice>().unwrap(), ProviderChoice::HuggingFace);
        assert!(matches!("openai".parse::<ProviderChoice>(), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_auto_resolution() {
        assert_eq!(ProviderChoice::Auto.resolve(true), Backend::HuggingFace);
        assert_eq!(ProviderChoice::Auto.resolve(false), Backend::Ollama);
        assert_eq!(ProviderChoice::Ollama.resolve(true), Backend::Ollama);
        assert_eq!(ProviderChoice::HuggingFace.resolve(false), Backend::HuggingFace);
    }

    #[test]
    fn test_token_selects_huggingface() {
        let selected = select_provider_with(&|k| match k {
            "HF_TOKEN" => Some("hf_abc".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(selected.provider.name(), "huggingface");
        assert_eq!(selected.model, crate::huggingface::DEFAULT_MODEL);
    }

    #[test]
    fn test_forced_huggingface_without_token_fails() {
        let result = select_provider_with(&|k| match k {
            "LLM_PROVIDER" => Some("huggingface".into()),
            _ => None,
        });
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[cfg(feature = "ollama")]
    #[test]
    fn test_default_is_ollama() {
        let selected = select_provider_with(&|k| match k {
            "AGENT_MODEL" => Some("qwen2.5".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(selected.provider.name(), "ollama");
        assert_eq!(selected.model, "qwen2.5");
    }
}
