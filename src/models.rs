//! Data carried through the generation pipeline and persisted at the end of it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Caller-supplied generation parameters. Any field left `None` is sampled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeConstraints {
    #[serde(alias = "amountOfPersons")]
    pub servings: Option<u32>,
    pub dish_type: Option<String>,
    #[serde(alias = "maxCooking")]
    pub max_cooking_minutes: Option<u32>,
    #[serde(alias = "allergiesList")]
    pub allergies: Option<Vec<String>>,
    pub diet_requirements: Option<Vec<String>>,
    #[serde(alias = "cuisineList")]
    pub cuisines: Option<Vec<String>>,
}

impl RecipeConstraints {
    pub fn is_complete(&self) -> bool {
        self.servings.is_some()
            && self.dish_type.is_some()
            && self.max_cooking_minutes.is_some()
            && self.allergies.is_some()
            && self.diet_requirements.is_some()
            && self.cuisines.is_some()
    }
}

/// Constraints after randomization: every field is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedConstraints {
    pub servings: u32,
    pub dish_type: String,
    pub max_cooking_minutes: u32,
    pub allergies: Vec<String>,
    pub diet_requirements: Vec<String>,
    pub cuisines: Vec<String>,
}

impl From<CompletedConstraints> for RecipeConstraints {
    fn from(completed: CompletedConstraints) -> Self {
        Self {
            servings: Some(completed.servings),
            dish_type: Some(completed.dish_type),
            max_cooking_minutes: Some(completed.max_cooking_minutes),
            allergies: Some(completed.allergies),
            diet_requirements: Some(completed.diet_requirements),
            cuisines: Some(completed.cuisines),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeStatus {
    #[default]
    Active,
    Frozen,
}

impl fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeStatus::Active => write!(f, "ACTIVE"),
            RecipeStatus::Frozen => write!(f, "FROZEN"),
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid status '{0}'. Must be one of: ACTIVE, FROZEN")]
pub struct InvalidStatus(pub String);

impl FromStr for RecipeStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(RecipeStatus::Active),
            "FROZEN" => Ok(RecipeStatus::Frozen),
            _ => Err(InvalidStatus(s.to_string())),
        }
    }
}

/// One ingredient line: its name plus whatever measurement fields the model produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Ingredients as the model returned them. Models alternate between a list of
/// records and an object keyed by ingredient name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ingredients {
    List(Vec<Ingredient>),
    Mapping(Map<String, Value>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("ingredient '{name}' has {found} details, expected an object")]
    DetailsNotAnObject { name: String, found: &'static str },
}

/// Convert the mapping form into a list of `{Name, ...details}` records, keeping order.
pub fn normalize_ingredients(ingredients: Ingredients) -> Result<Vec<Ingredient>, ShapeError> {
    match ingredients {
        Ingredients::List(list) => Ok(list),
        Ingredients::Mapping(mapping) => mapping
            .into_iter()
            .map(|(name, details)| match details {
                Value::Object(mut details) => {
                    details.shift_remove("Name");
                    details.shift_remove("name");
                    Ok(Ingredient { name, details })
                }
                other => Err(ShapeError::DetailsNotAnObject {
                    name,
                    found: json_type_name(&other),
                }),
            })
            .collect(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "numeric",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accepts `"25 minutes"` as well as a bare `25`.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            json_type_name(&other)
        ))),
    }
}

/// A recipe as parsed from the synthesis completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedRecipe {
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(
        rename = "CookingTime",
        alias = "cooking_time",
        alias = "cookingTime",
        deserialize_with = "lenient_string"
    )]
    pub cooking_time: String,
    #[serde(
        rename = "RequiredTools",
        alias = "required_tools",
        alias = "requiredTools"
    )]
    pub required_tools: Vec<String>,
    #[serde(rename = "Ingredients", alias = "ingredients")]
    pub ingredients: Ingredients,
    #[serde(rename = "Step-by-step directions", alias = "steps", alias = "Steps")]
    pub steps: Vec<String>,
    /// Always starts out `Active`; whatever status the model echoes back is ignored.
    #[serde(default, skip_deserializing)]
    pub status: RecipeStatus,
}

/// Nutritional values exactly as the model reported them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutritionInfo(pub Map<String, Value>);

impl NutritionInfo {
    /// Numeric reading of a field; strings such as `"250 kcal"` yield their leading number.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => {
                let numeric: String = s
                    .trim()
                    .chars()
                    .take_while(|c| c.is_ascii_digit() || *c == '.')
                    .collect();
                numeric.parse().ok()
            }
            _ => None,
        }
    }
}

/// Recipe plus nutrition, ingredients already in list form. This is what gets
/// judged for realism and, once accepted, persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecipe {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "CookingTime")]
    pub cooking_time: String,
    #[serde(rename = "RequiredTools")]
    pub required_tools: Vec<String>,
    #[serde(rename = "Ingredients")]
    pub ingredients: Vec<Ingredient>,
    #[serde(rename = "Step-by-step directions")]
    pub steps: Vec<String>,
    pub nutrition: NutritionInfo,
    pub status: RecipeStatus,
}

/// Merge nutrition into the recipe and normalize the ingredient shape.
pub fn combine(
    recipe: SynthesizedRecipe,
    nutrition: NutritionInfo,
) -> Result<CombinedRecipe, ShapeError> {
    Ok(CombinedRecipe {
        name: recipe.name,
        cooking_time: recipe.cooking_time,
        required_tools: recipe.required_tools,
        ingredients: normalize_ingredients(recipe.ingredients)?,
        steps: recipe.steps,
        nutrition,
        status: recipe.status,
    })
}

/// A stored recipe record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecipe {
    pub id: Uuid,
    pub name: String,
    pub cooking_time: String,
    pub required_tools: Vec<String>,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
    pub nutrition: NutritionInfo,
    pub status: RecipeStatus,
}

impl PersistedRecipe {
    pub fn from_combined(id: Uuid, recipe: CombinedRecipe) -> Self {
        Self {
            id,
            name: recipe.name,
            cooking_time: recipe.cooking_time,
            required_tools: recipe.required_tools,
            ingredients: recipe.ingredients,
            steps: recipe.steps,
            nutrition: recipe.nutrition,
            status: recipe.status,
        }
    }

    /// Overwrite every field the edit supplies.
    pub fn apply_edit(&mut self, edit: RecipeEdit) {
        if let Some(name) = edit.name {
            self.name = name;
        }
        if let Some(cooking_time) = edit.cooking_time {
            self.cooking_time = cooking_time;
        }
        if let Some(required_tools) = edit.required_tools {
            self.required_tools = required_tools;
        }
        if let Some(ingredients) = edit.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(steps) = edit.steps {
            self.steps = steps;
        }
        if let Some(nutrition) = edit.nutrition {
            self.nutrition = nutrition;
        }
        if let Some(status) = edit.status {
            self.status = status;
        }
    }
}

/// Partial update of a stored recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeEdit {
    pub name: Option<String>,
    pub cooking_time: Option<String>,
    pub required_tools: Option<Vec<String>>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub steps: Option<Vec<String>>,
    pub nutrition: Option<NutritionInfo>,
    pub status: Option<RecipeStatus>,
}
