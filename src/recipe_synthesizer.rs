use tracing::info;

use crate::api_connection::LlmGateway;
use crate::error::{GenerationError, Stage};
use crate::models::{CompletedConstraints, RecipeStatus, SynthesizedRecipe};
use crate::response_parser::complete_with_retries;

/// Units the model may use for ingredient measurements.
pub const MEASUREMENT_UNITS: &[&str] = &["grams", "ml", "cups", "teaspoons", "tablespoons", "piece"];

fn list_or(values: &[String], empty: &str) -> String {
    if values.is_empty() {
        empty.to_string()
    } else {
        values.join(", ")
    }
}

pub fn build_recipe_prompt(constraints: &CompletedConstraints) -> String {
    let units = MEASUREMENT_UNITS
        .iter()
        .map(|unit| format!("\"{}\"", unit))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a recipe developer. Create a meal recipe for {servings} people.
Dish type: {dish_type}.
Total cooking time must be under {minutes} minutes.
It must be safe for people with allergies to: {allergies}.
It must follow these diet requirements: {diets}.
Preferred cuisines: {cuisines}.

Do not ask questions. Respond only with a JSON object in this format:
1. Top-level keys \"Name\", \"CookingTime\", \"RequiredTools\", \"Ingredients\", \"Step-by-step directions\".
2. \"Ingredients\" is a list of objects, each with a \"Name\" key.
3. Each ingredient has an \"amount\" and a \"unit\", the unit being one of {units}.
4. \"Step-by-step directions\" is a list of strings.
5. The JSON contains exactly one recipe.",
        servings = constraints.servings,
        dish_type = constraints.dish_type,
        minutes = constraints.max_cooking_minutes,
        allergies = list_or(&constraints.allergies, "none"),
        diets = list_or(&constraints.diet_requirements, "none"),
        cuisines = list_or(&constraints.cuisines, "any cuisine"),
        units = units,
    )
}

/// Ask the model for a recipe satisfying `constraints`, retrying unparsable answers.
pub async fn synthesize_recipe(
    gateway: &dyn LlmGateway,
    constraints: &CompletedConstraints,
    attempts: u32,
) -> Result<SynthesizedRecipe, GenerationError> {
    let prompt = build_recipe_prompt(constraints);
    let mut recipe: SynthesizedRecipe =
        complete_with_retries(gateway, &prompt, attempts, Stage::Synthesis).await?;
    recipe.status = RecipeStatus::Active;
    info!(name = %recipe.name, "recipe synthesized");
    Ok(recipe)
}
