//! LLM gateway: the single capability the pipeline needs from a model backend.
//!
//! Every stage talks to the model through [`LlmGateway`], so the orchestrator can
//! be handed the OpenRouter provider in production and a [`FakeGateway`] in tests.

pub mod connection;
pub mod endpoints;
pub mod fake;

pub use connection::ApiConnectionError;
pub use endpoints::Provider;
pub use fake::FakeGateway;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{ProviderKind, Settings};

/// Submit a prompt, receive a completion.
///
/// Implementations must be shareable across concurrently running generation tasks.
/// Errors are returned as-is; the pipeline never retries a failed call.
#[async_trait]
pub trait LlmGateway: Send + Sync + std::fmt::Debug {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError>;

    /// Short identifier used in logs ("openrouter", "fake").
    fn gateway_name(&self) -> &'static str;
}

/// Build the gateway selected by `settings.provider`.
pub fn gateway_from_settings(settings: &Settings) -> Arc<dyn LlmGateway> {
    match settings.provider {
        ProviderKind::OpenRouter => Arc::new(Provider::openrouter(
            &settings.api_key_env_var,
            &settings.model,
        )),
        ProviderKind::Fake => Arc::new(FakeGateway::with_demo_responses()),
    }
}
