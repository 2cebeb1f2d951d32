//! services/api/src/adapters/llm.rs
//!
//! Shared plumbing for the OpenAI-backed generation adapters: resolves the
//! effective credential, model, and prompt overrides at call time from the
//! settings store, with the server config as fallback.

use async_openai::{config::OpenAIConfig, Client};
use coursewise_core::domain::Settings;
use coursewise_core::ports::{PortError, PortResult, SettingsRepository};
use std::sync::Arc;

/// Everything a generation adapter needs to issue a request.
/// The credential and model are re-read from the settings store on every
/// call, so the client can rotate them without a server restart.
#[derive(Clone)]
pub struct LlmContext {
    settings: Arc<dyn SettingsRepository>,
    fallback_api_key: Option<String>,
    default_model: String,
}

/// A resolved request context: a configured client, the model to use, and
/// the settings snapshot the prompts should be read from.
pub struct ResolvedLlm {
    pub client: Client<OpenAIConfig>,
    pub model: String,
    pub settings: Settings,
}

impl LlmContext {
    pub fn new(
        settings: Arc<dyn SettingsRepository>,
        fallback_api_key: Option<String>,
        default_model: String,
    ) -> Self {
        Self {
            settings,
            fallback_api_key,
            default_model,
        }
    }

    /// Resolves the client for one generation call. Fails with
    /// `MissingCredential` before any network traffic when no key is set.
    pub async fn resolve(&self) -> PortResult<ResolvedLlm> {
        let settings = self.settings.load().await?;

        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.fallback_api_key.clone())
            .ok_or(PortError::MissingCredential)?;

        let model = settings
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());

        let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
        Ok(ResolvedLlm {
            client,
            model,
            settings,
        })
    }
}
