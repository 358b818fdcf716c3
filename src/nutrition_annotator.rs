use tracing::info;

use crate::api_connection::LlmGateway;
use crate::error::{GenerationError, Stage};
use crate::models::{NutritionInfo, SynthesizedRecipe};
use crate::response_parser::complete_with_retries;

pub fn build_nutrition_prompt(recipe: &SynthesizedRecipe) -> String {
    let recipe_json =
        serde_json::to_string_pretty(recipe).unwrap_or_else(|_| format!("{:?}", recipe));

    format!(
        "You are a food technologist. The recipe is given between <recipe> and </recipe>.
Work out the total weight of the dish, the number of servings, and its nutritional values.
Do not ask questions. Respond only with a JSON object with the keys
\"calories\", \"protein\", \"fat\", \"carbohydrates\" and \"totalWeight\".
<recipe>
{}
</recipe>",
        recipe_json
    )
}

/// Ask the model for the nutritional values of `recipe`, retrying unparsable answers.
pub async fn annotate_nutrition(
    gateway: &dyn LlmGateway,
    recipe: &SynthesizedRecipe,
    attempts: u32,
) -> Result<NutritionInfo, GenerationError> {
    let prompt = build_nutrition_prompt(recipe);
    let nutrition: NutritionInfo =
        complete_with_retries(gateway, &prompt, attempts, Stage::Nutrition).await?;
    info!(
        calories = ?nutrition.number("calories"),
        fields = nutrition.0.len(),
        "nutrition calculated"
    );
    Ok(nutrition)
}
