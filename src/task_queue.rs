//! In-process background runtime for generation tasks.
//!
//! Each submitted task gets a UUID and moves through
//! `PENDING → STARTED → SUCCESS | FAILURE`. At most `workers` tasks run the
//! pipeline at once; the rest wait in `PENDING`.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::models::{CombinedRecipe, RecipeConstraints};
use crate::orchestrator::RecipeOrchestrator;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Started,
    Success { recipe: CombinedRecipe },
    Failure { error: String },
}

impl TaskState {
    pub fn name(&self) -> &'static str {
        match self {
            TaskState::Pending => "PENDING",
            TaskState::Started => "STARTED",
            TaskState::Success { .. } => "SUCCESS",
            TaskState::Failure { .. } => "FAILURE",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Success { .. } | TaskState::Failure { .. })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Unknown task: {0}")]
    UnknownTask(Uuid),

    #[error("Task {0} was already submitted")]
    DuplicateTask(Uuid),
}

#[derive(Debug, Clone)]
pub struct TaskQueue {
    orchestrator: Arc<RecipeOrchestrator>,
    states: Arc<RwLock<HashMap<Uuid, TaskState>>>,
    handles: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
    workers: Arc<Semaphore>,
}

impl TaskQueue {
    pub fn new(orchestrator: Arc<RecipeOrchestrator>, workers: usize) -> Self {
        Self {
            orchestrator,
            states: Arc::new(RwLock::new(HashMap::new())),
            handles: Arc::new(Mutex::new(HashMap::new())),
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Submit under a fresh id. Must be called from within a tokio runtime.
    pub fn submit(&self, constraints: RecipeConstraints, use_weights: bool) -> Uuid {
        let task_id = Uuid::new_v4();
        // a fresh v4 id cannot collide with a submitted one
        let _ = self.submit_with_id(task_id, constraints, use_weights);
        task_id
    }

    /// Submit under a caller-chosen id; the same id later keys the stored recipe.
    pub fn submit_with_id(
        &self,
        task_id: Uuid,
        constraints: RecipeConstraints,
        use_weights: bool,
    ) -> Result<(), TaskError> {
        {
            let mut states = self.states.write();
            if states.contains_key(&task_id) {
                return Err(TaskError::DuplicateTask(task_id));
            }
            states.insert(task_id, TaskState::Pending);
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let states = Arc::clone(&self.states);
        let handles = Arc::clone(&self.handles);
        let workers = Arc::clone(&self.workers);
        let span = info_span!("generation", task_id = %task_id);

        // held until the handle is registered, so the runner's own removal comes after the insert
        let mut registered = self.handles.lock();
        let handle = tokio::spawn(
            async move {
                let outcome = match workers.acquire_owned().await {
                    Ok(_permit) => {
                        set_started(&states, task_id);
                        match orchestrator.run(constraints, task_id, use_weights).await {
                            Ok(recipe) => TaskState::Success { recipe },
                            Err(e) => {
                                error!(error = %e, "generation task failed");
                                TaskState::Failure {
                                    error: e.to_string(),
                                }
                            }
                        }
                    }
                    Err(_) => TaskState::Failure {
                        error: "worker pool closed".to_string(),
                    },
                };
                handles.lock().remove(&task_id);
                finish(&states, task_id, outcome);
            }
            .instrument(span),
        );
        registered.insert(task_id, handle);
        drop(registered);

        info!(%task_id, "recipe generation task submitted");
        Ok(())
    }

    pub fn state(&self, task_id: Uuid) -> Option<TaskState> {
        self.states.read().get(&task_id).cloned()
    }

    /// Tasks whose runner has not exited yet.
    pub fn active_tasks(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn task_ids(&self) -> Vec<Uuid> {
        self.states.read().keys().copied().collect()
    }

    /// Poll until the task reaches SUCCESS or FAILURE.
    pub async fn wait(&self, task_id: Uuid, poll_interval: Duration) -> Result<TaskState, TaskError> {
        loop {
            let state = self.state(task_id).ok_or(TaskError::UnknownTask(task_id))?;
            if state.is_finished() {
                return Ok(state);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Abort a task that has not finished yet. Returns whether anything was cancelled.
    ///
    /// A record the task already committed stays in the store.
    pub fn cancel(&self, task_id: Uuid) -> Result<bool, TaskError> {
        let mut states = self.states.write();
        let state = states
            .get_mut(&task_id)
            .ok_or(TaskError::UnknownTask(task_id))?;
        if state.is_finished() {
            return Ok(false);
        }
        if let Some(handle) = self.handles.lock().remove(&task_id) {
            handle.abort();
        }
        *state = TaskState::Failure {
            error: "Task cancelled".to_string(),
        };
        info!(%task_id, "recipe generation task cancelled");
        Ok(true)
    }
}

fn set_started(states: &RwLock<HashMap<Uuid, TaskState>>, task_id: Uuid) {
    let mut states = states.write();
    if let Some(state) = states.get_mut(&task_id) {
        if *state == TaskState::Pending {
            *state = TaskState::Started;
        }
    }
}

/// Record the terminal state unless the task was cancelled in the meantime.
fn finish(states: &RwLock<HashMap<Uuid, TaskState>>, task_id: Uuid, outcome: TaskState) {
    let mut states = states.write();
    if let Some(state) = states.get_mut(&task_id) {
        if !state.is_finished() {
            *state = outcome;
        }
    }
}
