use tracing::debug;

use crate::api_connection::LlmGateway;
use crate::error::{GenerationError, Stage};
use crate::models::CombinedRecipe;

pub fn build_validation_prompt(recipe: &CombinedRecipe) -> String {
    let recipe_json =
        serde_json::to_string_pretty(recipe).unwrap_or_else(|_| format!("{:?}", recipe));

    format!(
        "You are a professional chef. The recipe is given between <recipe> and </recipe>.
Decide whether it is realistic. Check the ratio of the ingredients,
whether the step-by-step directions are clear and precise,
and whether the ingredient combinations and flavour pairings are harmonious and enjoyable.
Answer only \"Yes\" or \"No\".
<recipe>
{}
</recipe>",
        recipe_json
    )
}

/// The model's raw verdict on `recipe`. Not retried and not parsed.
pub async fn judge_realism(
    gateway: &dyn LlmGateway,
    recipe: &CombinedRecipe,
) -> Result<String, GenerationError> {
    let judgment = gateway
        .complete(&build_validation_prompt(recipe))
        .await
        .map_err(GenerationError::gateway(Stage::Validation))?;
    debug!(%judgment, "realism judgment received");
    Ok(judgment)
}

/// Acceptance is a plain substring test, so "Yes, this is realistic" passes.
pub fn is_realistic(judgment: &str) -> bool {
    judgment.contains("Yes")
}
