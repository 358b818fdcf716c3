use recipe_forge::api_connection::FakeGateway;
use recipe_forge::config::PipelineSettings;
use recipe_forge::error::{GenerationError, Stage};
use recipe_forge::models::{
    CompletedConstraints, NutritionInfo, RecipeConstraints, RecipeStatus, SynthesizedRecipe,
};
use recipe_forge::nutrition_annotator::annotate_nutrition;
use recipe_forge::orchestrator::RecipeOrchestrator;
use recipe_forge::recipe_synthesizer::synthesize_recipe;
use recipe_forge::store::{InMemoryRecipeStore, RecipeStore};
use recipe_forge::task_queue::{TaskError, TaskQueue, TaskState};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const RECIPE_KEY: &str = "meal recipe";
const NUTRITION_KEY: &str = "food technologist";
const VALIDATION_KEY: &str = "professional chef";

const RECIPE_JSON: &str = r#"{
  "Name": "Tomato Basil Omelette",
  "CookingTime": "15 minutes",
  "RequiredTools": ["whisk", "frying pan"],
  "Ingredients": [
    {"Name": "eggs", "amount": 3, "unit": "piece"},
    {"Name": "tomato", "amount": 100, "unit": "grams"},
    {"Name": "basil", "amount": 1, "unit": "tablespoons"}
  ],
  "Step-by-step directions": ["Whisk the eggs.", "Cook with tomato and basil."]
}"#;

const NUTRITION_JSON: &str = r#"{"calories": 320, "protein": 21, "fat": 22, "carbohydrates": 6, "totalWeight": 280}"#;

fn constraints() -> CompletedConstraints {
    CompletedConstraints {
        servings: 2,
        dish_type: "main".to_string(),
        max_cooking_minutes: 30,
        allergies: vec!["nuts".to_string()],
        diet_requirements: vec!["vegetarian".to_string()],
        cuisines: vec![],
    }
}

fn scripted_gateway(judgment: &str) -> FakeGateway {
    let gateway = FakeGateway::new();
    gateway.add_response(RECIPE_KEY, RECIPE_JSON);
    gateway.add_response(NUTRITION_KEY, NUTRITION_JSON);
    gateway.add_response(VALIDATION_KEY, judgment);
    gateway
}

fn settings(max_realism_attempts: Option<u32>) -> PipelineSettings {
    PipelineSettings {
        parse_retry_limit: 10,
        max_realism_attempts,
    }
}

fn orchestrator(
    gateway: Arc<FakeGateway>,
    store: Arc<InMemoryRecipeStore>,
    max_realism_attempts: Option<u32>,
) -> RecipeOrchestrator {
    RecipeOrchestrator::new(gateway, store, settings(max_realism_attempts))
}

#[tokio::test]
async fn test_synthesis_succeeds_on_tenth_attempt() {
    let gateway = FakeGateway::with_response(RECIPE_KEY, RECIPE_JSON);
    for _ in 0..9 {
        gateway.push_response(RECIPE_KEY, "Sure! Here is a lovely recipe for you.");
    }

    let recipe = synthesize_recipe(&gateway, &constraints(), 10).await.unwrap();
    assert_eq!(recipe.name, "Tomato Basil Omelette");
    assert_eq!(recipe.status, RecipeStatus::Active);
    assert_eq!(gateway.call_count(RECIPE_KEY), 10);
}

#[tokio::test]
async fn test_synthesis_gives_up_after_ten_unparsable_answers() {
    let gateway = FakeGateway::with_response(RECIPE_KEY, "{ not json");

    let result = synthesize_recipe(&gateway, &constraints(), 10).await;
    assert!(matches!(
        result,
        Err(GenerationError::StageExhausted {
            stage: Stage::Synthesis,
            attempts: 10
        })
    ));
    assert_eq!(gateway.call_count(RECIPE_KEY), 10);
}

#[tokio::test]
async fn test_structurally_wrong_json_counts_as_parse_failure() {
    let gateway = FakeGateway::with_response(RECIPE_KEY, r#"{"title": "no recipe keys"}"#);

    let result = synthesize_recipe(&gateway, &constraints(), 3).await;
    assert!(matches!(
        result,
        Err(GenerationError::StageExhausted { attempts: 3, .. })
    ));
    assert_eq!(gateway.call_count(RECIPE_KEY), 3);
}

#[tokio::test]
async fn test_nutrition_retries_then_exhausts() {
    let recipe: SynthesizedRecipe = serde_json::from_str(RECIPE_JSON).unwrap();

    let gateway = FakeGateway::with_response(NUTRITION_KEY, NUTRITION_JSON);
    gateway.push_response(NUTRITION_KEY, "about 300 kcal");
    let nutrition = annotate_nutrition(&gateway, &recipe, 10).await.unwrap();
    assert_eq!(nutrition.number("calories"), Some(320.0));
    assert_eq!(gateway.call_count(NUTRITION_KEY), 2);

    let gateway = FakeGateway::with_response(NUTRITION_KEY, "[1, 2, 3]");
    let result = annotate_nutrition(&gateway, &recipe, 10).await;
    assert!(matches!(
        result,
        Err(GenerationError::StageExhausted {
            stage: Stage::Nutrition,
            attempts: 10
        })
    ));
    assert_eq!(gateway.call_count(NUTRITION_KEY), 10);
}

#[tokio::test]
async fn test_gateway_failure_is_not_retried() {
    let gateway = FakeGateway::with_response(RECIPE_KEY, RECIPE_JSON);
    gateway.push_failure(RECIPE_KEY, "connection reset");

    let result = synthesize_recipe(&gateway, &constraints(), 10).await;
    assert!(matches!(
        result,
        Err(GenerationError::Gateway {
            stage: Stage::Synthesis,
            ..
        })
    ));
    assert_eq!(gateway.call_count(RECIPE_KEY), 1);
}

#[tokio::test]
async fn test_accepted_recipe_is_persisted_under_task_id() {
    let gateway = Arc::new(scripted_gateway("Yes, this is realistic"));
    let store = Arc::new(InMemoryRecipeStore::new());
    let orchestrator = orchestrator(Arc::clone(&gateway), Arc::clone(&store), Some(20));
    let task_id = Uuid::new_v4();

    let recipe = orchestrator
        .run(RecipeConstraints::default(), task_id, false)
        .await
        .unwrap();
    assert_eq!(recipe.ingredients.len(), 3);
    assert_eq!(recipe.ingredients[0].name, "eggs");

    assert_eq!(store.len(), 1);
    let record = store.fetch_by_id(task_id).await.unwrap().unwrap();
    assert_eq!(record.id, task_id);
    assert_eq!(record.name, "Tomato Basil Omelette");
    assert_eq!(record.status, RecipeStatus::Active);
    let expected: NutritionInfo = serde_json::from_str(NUTRITION_JSON).unwrap();
    assert_eq!(record.nutrition, expected);
    assert_eq!(recipe.nutrition, expected);

    assert_eq!(gateway.call_count(RECIPE_KEY), 1);
    assert_eq!(gateway.call_count(NUTRITION_KEY), 1);
    assert_eq!(gateway.call_count(VALIDATION_KEY), 1);
}

#[tokio::test]
async fn test_rejected_recipes_are_regenerated() {
    let gateway = Arc::new(scripted_gateway("Yes"));
    gateway.push_response(VALIDATION_KEY, "No");
    gateway.push_response(VALIDATION_KEY, "No, the ratios are off");
    let store = Arc::new(InMemoryRecipeStore::new());
    let orchestrator = orchestrator(Arc::clone(&gateway), Arc::clone(&store), None);

    orchestrator
        .run(RecipeConstraints::default(), Uuid::new_v4(), true)
        .await
        .unwrap();

    assert_eq!(gateway.call_count(VALIDATION_KEY), 3);
    assert_eq!(gateway.call_count(RECIPE_KEY), 3);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_never_realistic_stops_at_the_attempt_cap() {
    let gateway = Arc::new(scripted_gateway("No"));
    let store = Arc::new(InMemoryRecipeStore::new());
    let orchestrator = orchestrator(Arc::clone(&gateway), Arc::clone(&store), Some(5));

    let result = orchestrator
        .run(RecipeConstraints::default(), Uuid::new_v4(), false)
        .await;
    assert!(matches!(result, Err(GenerationError::Unrealistic { attempts: 5 })));
    assert_eq!(gateway.call_count(VALIDATION_KEY), 5);
    assert!(store.is_empty());
}

fn gateway_for_task(index: usize) -> FakeGateway {
    let recipe = json!({
        "Name": format!("Soup No. {}", index),
        "CookingTime": format!("{} minutes", 10 + index),
        "RequiredTools": ["pot"],
        "Ingredients": {
            format!("vegetable {}", index): {"amount": 100 + index, "unit": "grams"}
        },
        "Step-by-step directions": [format!("Simmer batch {}.", index)]
    });
    let nutrition = json!({"calories": 100 * (index + 1), "batch": index});

    let gateway = FakeGateway::new();
    gateway.add_response(RECIPE_KEY, &recipe.to_string());
    gateway.add_response(NUTRITION_KEY, &nutrition.to_string());
    gateway.add_response(VALIDATION_KEY, "Yes");
    gateway
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_write_distinct_records() {
    let store = Arc::new(InMemoryRecipeStore::new());
    let mut handles = Vec::new();

    for index in 0..8 {
        let orchestrator = orchestrator(
            Arc::new(gateway_for_task(index)),
            Arc::clone(&store),
            Some(3),
        );
        let task_id = Uuid::new_v4();
        handles.push((
            index,
            task_id,
            tokio::spawn(async move {
                orchestrator
                    .run(RecipeConstraints::default(), task_id, true)
                    .await
            }),
        ));
    }

    let mut task_ids = Vec::new();
    for (index, task_id, handle) in handles {
        let recipe = handle.await.unwrap().unwrap();
        assert_eq!(recipe.name, format!("Soup No. {}", index));
        task_ids.push((index, task_id));
    }

    assert_eq!(store.len(), 8);
    for (index, task_id) in task_ids {
        let record = store.fetch_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(record.id, task_id);
        assert_eq!(record.name, format!("Soup No. {}", index));
        assert_eq!(record.cooking_time, format!("{} minutes", 10 + index));
        assert_eq!(record.ingredients.len(), 1);
        assert_eq!(record.ingredients[0].name, format!("vegetable {}", index));
        assert_eq!(record.ingredients[0].details["amount"], json!(100 + index));
        assert_eq!(record.steps, vec![format!("Simmer batch {}.", index)]);
        assert_eq!(
            record.nutrition,
            serde_json::from_value::<NutritionInfo>(json!({
                "calories": 100 * (index + 1),
                "batch": index
            }))
            .unwrap()
        );
    }
}

#[tokio::test]
async fn test_task_reaches_success() {
    let gateway = Arc::new(scripted_gateway("Yes"));
    let store = Arc::new(InMemoryRecipeStore::new());
    let queue = TaskQueue::new(
        Arc::new(orchestrator(gateway, Arc::clone(&store), Some(3))),
        2,
    );

    let task_id = queue.submit(RecipeConstraints::default(), false);
    assert!(queue.state(task_id).is_some());

    let state = queue.wait(task_id, Duration::from_millis(5)).await.unwrap();
    match state {
        TaskState::Success { recipe } => assert_eq!(recipe.name, "Tomato Basil Omelette"),
        other => panic!("unexpected state: {:?}", other),
    }
    assert_eq!(queue.state(task_id).map(|s| s.name()), Some("SUCCESS"));
    assert_eq!(queue.active_tasks(), 0);
    assert!(store.fetch_by_id(task_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_task_failure_names_the_stage() {
    let gateway = Arc::new(FakeGateway::with_response(RECIPE_KEY, "not a recipe"));
    let store = Arc::new(InMemoryRecipeStore::new());
    let queue = TaskQueue::new(
        Arc::new(orchestrator(gateway, Arc::clone(&store), Some(3))),
        1,
    );

    let task_id = queue.submit(RecipeConstraints::default(), false);
    let state = queue.wait(task_id, Duration::from_millis(5)).await.unwrap();
    match state {
        TaskState::Failure { error } => assert!(error.contains("recipe synthesis"), "{}", error),
        other => panic!("unexpected state: {:?}", other),
    }
    assert!(store.is_empty());
    assert_eq!(queue.active_tasks(), 0);
}

#[tokio::test]
async fn test_task_ids_are_unique_and_known() {
    let gateway = Arc::new(scripted_gateway("Yes"));
    let store = Arc::new(InMemoryRecipeStore::new());
    let queue = TaskQueue::new(Arc::new(orchestrator(gateway, store, Some(3))), 1);

    let task_id = Uuid::new_v4();
    queue
        .submit_with_id(task_id, RecipeConstraints::default(), false)
        .unwrap();
    assert_eq!(
        queue.submit_with_id(task_id, RecipeConstraints::default(), false),
        Err(TaskError::DuplicateTask(task_id))
    );

    let unknown = Uuid::new_v4();
    assert!(queue.state(unknown).is_none());
    assert_eq!(
        queue.wait(unknown, Duration::from_millis(5)).await,
        Err(TaskError::UnknownTask(unknown))
    );
    assert_eq!(queue.cancel(unknown), Err(TaskError::UnknownTask(unknown)));

    queue.wait(task_id, Duration::from_millis(5)).await.unwrap();
    assert_eq!(queue.cancel(task_id), Ok(false));
}

#[tokio::test]
async fn test_cancel_marks_pending_task_failed() {
    // current-thread runtime: neither task runs before the first await below
    let gateway = Arc::new(scripted_gateway("No"));
    let store = Arc::new(InMemoryRecipeStore::new());
    let queue = TaskQueue::new(
        Arc::new(orchestrator(gateway, Arc::clone(&store), Some(3))),
        1,
    );

    let busy = queue.submit(RecipeConstraints::default(), false);
    let waiting = queue.submit(RecipeConstraints::default(), false);

    assert_eq!(queue.cancel(waiting), Ok(true));
    assert_eq!(
        queue.state(waiting),
        Some(TaskState::Failure {
            error: "Task cancelled".to_string()
        })
    );
    assert_eq!(queue.cancel(busy), Ok(true));

    let state = queue.wait(busy, Duration::from_millis(5)).await.unwrap();
    assert_eq!(state.name(), "FAILURE");
    assert!(store.is_empty());
    assert_eq!(queue.task_ids().len(), 2);
    assert_eq!(queue.active_tasks(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_finished_tasks_release_their_handles() {
    let store = Arc::new(InMemoryRecipeStore::new());
    let queue = TaskQueue::new(
        Arc::new(orchestrator(
            Arc::new(scripted_gateway("Yes")),
            Arc::clone(&store),
            Some(3),
        )),
        4,
    );

    let task_ids: Vec<Uuid> = (0..16)
        .map(|_| queue.submit(RecipeConstraints::default(), false))
        .collect();
    for task_id in &task_ids {
        let state = queue.wait(*task_id, Duration::from_millis(1)).await.unwrap();
        assert_eq!(state.name(), "SUCCESS");
    }

    assert_eq!(queue.active_tasks(), 0);
    assert_eq!(store.len(), 16);
}
