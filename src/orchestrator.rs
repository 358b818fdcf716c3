//! The generate → annotate → validate loop for a single generation task.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api_connection::LlmGateway;
use crate::config::PipelineSettings;
use crate::error::GenerationError;
use crate::models::{combine, CombinedRecipe, CompletedConstraints, RecipeConstraints};
use crate::nutrition_annotator::annotate_nutrition;
use crate::randomizer::fill_constraints;
use crate::realism_validator::{is_realistic, judge_realism};
use crate::recipe_synthesizer::synthesize_recipe;
use crate::store::RecipeStore;

/// Result of one pass through synthesis, nutrition and validation.
#[derive(Debug)]
pub enum AttemptOutcome {
    Accepted(CombinedRecipe),
    Rejected { judgment: String },
}

#[derive(Debug, Clone)]
pub struct RecipeOrchestrator {
    gateway: Arc<dyn LlmGateway>,
    store: Arc<dyn RecipeStore>,
    settings: PipelineSettings,
}

impl RecipeOrchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        store: Arc<dyn RecipeStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
        }
    }

    /// Generate, validate and persist one recipe under `task_id`.
    ///
    /// Constraints are completed once; every attempt reuses them. The record is
    /// written only after a positive realism judgment.
    pub async fn run(
        &self,
        constraints: RecipeConstraints,
        task_id: Uuid,
        use_weights: bool,
    ) -> Result<CombinedRecipe, GenerationError> {
        let completed = fill_constraints(constraints, use_weights);
        info!(
            gateway = self.gateway.gateway_name(),
            servings = completed.servings,
            dish_type = %completed.dish_type,
            max_minutes = completed.max_cooking_minutes,
            use_weights,
            "starting recipe generation"
        );

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if let Some(limit) = self.settings.max_realism_attempts {
                if attempt > limit {
                    warn!(limit, "giving up: no recipe judged realistic");
                    return Err(GenerationError::Unrealistic { attempts: limit });
                }
            }

            match self.attempt(&completed).await? {
                AttemptOutcome::Accepted(recipe) => {
                    info!(attempt, name = %recipe.name, "recipe accepted");
                    self.store.save(task_id, recipe.clone()).await?;
                    return Ok(recipe);
                }
                AttemptOutcome::Rejected { judgment } => {
                    info!(attempt, judgment = %judgment.trim(), "recipe judged unrealistic, retrying");
                }
            }
        }
    }

    /// One attempt: synthesize, annotate, combine, validate.
    pub async fn attempt(
        &self,
        constraints: &CompletedConstraints,
    ) -> Result<AttemptOutcome, GenerationError> {
        let gateway = self.gateway.as_ref();
        let retries = self.settings.parse_retry_limit;

        let recipe = synthesize_recipe(gateway, constraints, retries).await?;
        let nutrition = annotate_nutrition(gateway, &recipe, retries).await?;
        let combined = combine(recipe, nutrition)?;

        let judgment = judge_realism(gateway, &combined).await?;
        if is_realistic(&judgment) {
            Ok(AttemptOutcome::Accepted(combined))
        } else {
            Ok(AttemptOutcome::Rejected { judgment })
        }
    }
}
