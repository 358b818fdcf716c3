//! Turning raw completions into structured values.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api_connection::LlmGateway;
use crate::error::{GenerationError, Stage};

/// Remove a surrounding markdown code fence (```` ```json ```` or bare ```` ``` ````).
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let opened = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    opened.strip_suffix("```").unwrap_or(opened).trim()
}

/// Parse a completion into `T`. Any failure, syntactic or structural, is `None`.
pub fn parse_llm_json<T: DeserializeOwned>(content: &str) -> Option<T> {
    let stripped = strip_code_fence(content);
    match serde_json::from_str(stripped) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "completion is not the expected JSON");
            None
        }
    }
}

/// Send the same prompt until the completion parses, at most `attempts` times.
///
/// Gateway errors end the loop immediately; only parse failures are retried.
pub async fn complete_with_retries<T: DeserializeOwned>(
    gateway: &dyn LlmGateway,
    prompt: &str,
    attempts: u32,
    stage: Stage,
) -> Result<T, GenerationError> {
    for attempt in 1..=attempts {
        let completion = gateway
            .complete(prompt)
            .await
            .map_err(GenerationError::gateway(stage))?;

        if let Some(parsed) = parse_llm_json(&completion) {
            debug!(%stage, attempt, "completion parsed");
            return Ok(parsed);
        }
        warn!(%stage, attempt, attempts, "unparsable completion, retrying");
    }
    Err(GenerationError::StageExhausted { stage, attempts })
}
