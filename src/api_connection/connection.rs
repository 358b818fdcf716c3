use async_trait::async_trait;
use dotenv::dotenv;
use reqwest::Client;
use std::env;
use thiserror::Error;
use tracing::{debug, warn};

use super::endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Provider, OPENROUTER_CHAT_URL,
};
use super::LlmGateway;

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },

    #[error("API returned no completion choices")]
    EmptyCompletion,

    #[error("Request failed: {0}")]
    RequestFailed(String),
}

impl Provider {
    pub fn openrouter(api_key_env_var_name: &str, model: &str) -> Self {
        dotenv().ok();
        Self::OpenRouter {
            api_key: api_key_env_var_name.to_string(),
            model: model.to_string(),
            temperature: None,
        }
    }

    pub fn with_temperature(self, value: f32) -> Self {
        match self {
            Provider::OpenRouter { api_key, model, .. } => Provider::OpenRouter {
                api_key,
                model,
                temperature: Some(value),
            },
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::OpenRouter { model, .. } => model,
        }
    }

    pub async fn call_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        match self {
            Provider::OpenRouter {
                api_key: api_key_env_var_name,
                ..
            } => {
                let actual_api_key = env::var(api_key_env_var_name)
                    .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var_name.clone()))?;

                let site_url =
                    env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
                let app_name = env::var("APP_NAME").unwrap_or_else(|_| "RecipeForge".to_string());

                let response = Client::new()
                    .post(OPENROUTER_CHAT_URL)
                    .bearer_auth(actual_api_key)
                    .header("HTTP-Referer", site_url)
                    .header("X-Title", app_name)
                    .json(&request)
                    .send()
                    .await?;

                if response.status().is_success() {
                    let chat_response = response.json::<ChatCompletionResponse>().await?;
                    Ok(chat_response)
                } else {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    warn!(%status, "chat completion rejected by OpenRouter");
                    Err(ApiConnectionError::ApiError { status, error_body })
                }
            }
        }
    }
}

#[async_trait]
impl LlmGateway for Provider {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        let Provider::OpenRouter {
            model, temperature, ..
        } = self;

        let request = ChatCompletionRequest {
            model: model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: *temperature,
            max_tokens: Some(2048),
        };

        let response = self.call_chat_completion(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                total_tokens = usage.total_tokens,
                "completion received"
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or(ApiConnectionError::EmptyCompletion)
    }

    fn gateway_name(&self) -> &'static str {
        "openrouter"
    }
}
