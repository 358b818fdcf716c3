use anyhow::{anyhow, Context, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use recipe_forge::api_connection::gateway_from_settings;
use recipe_forge::cli::{parse_args, Command, GenerateArgs};
use recipe_forge::config::{ProviderKind, Settings};
use recipe_forge::models::RecipeEdit;
use recipe_forge::orchestrator::RecipeOrchestrator;
use recipe_forge::store::{JsonFileRecipeStore, RecipeStore};
use recipe_forge::task_queue::{TaskQueue, TaskState};
use recipe_forge::telemetry::init_tracing;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok(); // Load .env file for API keys
    init_tracing();

    let cli = parse_args();
    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Some(dir) = cli.store_dir {
        settings.store_dir = dir;
    }
    if cli.offline {
        settings.provider = ProviderKind::Fake;
    }

    let store: Arc<dyn RecipeStore> = Arc::new(JsonFileRecipeStore::new(&settings.store_dir));

    match cli.command {
        Command::Generate(args) => generate(&settings, store, &args).await,
        Command::Show { id } => {
            let recipe = store
                .fetch_by_id(id)
                .await?
                .ok_or_else(|| anyhow!("Recipe not found: {}", id))?;
            print_json(&recipe)
        }
        Command::List => print_json(&store.fetch_all().await?),
        Command::SetStatus { id, status } => {
            let recipe = store
                .set_status(id, status)
                .await
                .with_context(|| format!("Failed to set status of recipe {}", id))?;
            print_json(&json!({ "id": recipe.id, "status": recipe.status }))
        }
        Command::Edit { id, file } => {
            let body = fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read edit file '{}'", file.display()))?;
            let edit: RecipeEdit = serde_json::from_str(&body)
                .with_context(|| format!("Edit file '{}' is not a valid recipe edit", file.display()))?;
            let recipe = store
                .update(id, edit)
                .await
                .with_context(|| format!("Failed to update recipe {}", id))?;
            print_json(&recipe)
        }
    }
}

async fn generate(settings: &Settings, store: Arc<dyn RecipeStore>, args: &GenerateArgs) -> Result<()> {
    let gateway = gateway_from_settings(settings);
    let orchestrator = Arc::new(RecipeOrchestrator::new(gateway, Arc::clone(&store), settings.pipeline));
    let queue = TaskQueue::new(orchestrator, settings.workers);

    let task_ids: Vec<_> = (0..args.count.max(1))
        .map(|_| queue.submit(args.constraints(), args.use_weights))
        .collect();
    info!(
        count = task_ids.len(),
        workers = settings.workers,
        active = queue.active_tasks(),
        "generation tasks submitted"
    );

    let mut failures = 0usize;
    for task_id in &task_ids {
        match queue.wait(*task_id, POLL_INTERVAL).await? {
            TaskState::Success { .. } => {
                let recipe = store
                    .fetch_by_id(*task_id)
                    .await?
                    .ok_or_else(|| anyhow!("Recipe {} missing after a successful task", task_id))?;
                print_json(&recipe)?;
            }
            TaskState::Failure { error } => {
                failures += 1;
                warn!(%task_id, %error, "generation task failed");
                print_json(&json!({ "recipe_id": task_id, "status": "FAILURE", "error": error }))?;
            }
            TaskState::Pending | TaskState::Started => {}
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} generation tasks failed", failures, task_ids.len()));
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
