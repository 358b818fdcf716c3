use std::fmt;
use thiserror::Error;

use crate::api_connection::ApiConnectionError;
use crate::models::ShapeError;
use crate::store::StoreError;

/// Pipeline stage that talks to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesis,
    Nutrition,
    Validation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Synthesis => write!(f, "recipe synthesis"),
            Stage::Nutrition => write!(f, "nutrition calculation"),
            Stage::Validation => write!(f, "realism validation"),
        }
    }
}

/// Every way a generation task can end without an accepted recipe.
///
/// Messages name the failing stage and never embed prompt text, since they are
/// surfaced verbatim to whoever polls the task.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{stage} exhausted: no parsable response after {attempts} attempts")]
    StageExhausted { stage: Stage, attempts: u32 },

    #[error("LLM gateway failed during {stage}: {source}")]
    Gateway {
        stage: Stage,
        #[source]
        source: ApiConnectionError,
    },

    #[error("Ingredient normalization failed: {0}")]
    Shape(#[from] ShapeError),

    #[error("Failed to persist recipe: {0}")]
    Persistence(#[from] StoreError),

    #[error("Could not produce a realistic recipe after {attempts} attempts")]
    Unrealistic { attempts: u32 },
}

impl GenerationError {
    pub fn gateway(stage: Stage) -> impl FnOnce(ApiConnectionError) -> Self {
        move |source| GenerationError::Gateway { stage, source }
    }
}
