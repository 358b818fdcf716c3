use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::models::{RecipeConstraints, RecipeStatus};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding one JSON file per recipe (overrides RECIPE_STORE_DIR)
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Answer every prompt with canned responses instead of calling the API
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate recipes; unset constraints are chosen at random
    Generate(GenerateArgs),
    /// Print one stored recipe
    Show { id: Uuid },
    /// Print every stored recipe
    List,
    /// Mark a recipe ACTIVE or FROZEN
    SetStatus { id: Uuid, status: RecipeStatus },
    /// Apply a partial edit read from a JSON file
    Edit {
        id: Uuid,
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    #[arg(long)]
    pub servings: Option<u32>,

    #[arg(long)]
    pub dish_type: Option<String>,

    #[arg(long)]
    pub max_minutes: Option<u32>,

    /// Comma-separated; pass "" for none
    #[arg(long, value_delimiter = ',')]
    pub allergies: Option<Vec<String>>,

    /// Comma-separated; pass "" for none
    #[arg(long, value_delimiter = ',')]
    pub diet: Option<Vec<String>>,

    /// Comma-separated; pass "" for any
    #[arg(long, value_delimiter = ',')]
    pub cuisines: Option<Vec<String>>,

    /// Sample unset constraints by domain weight instead of uniformly
    #[arg(long)]
    pub use_weights: bool,

    /// Number of independent generation tasks to run
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,
}

impl GenerateArgs {
    pub fn constraints(&self) -> RecipeConstraints {
        RecipeConstraints {
            servings: self.servings,
            dish_type: self.dish_type.clone(),
            max_cooking_minutes: self.max_minutes,
            allergies: self.allergies.as_deref().map(non_empty),
            diet_requirements: self.diet.as_deref().map(non_empty),
            cuisines: self.cuisines.as_deref().map(non_empty),
        }
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
