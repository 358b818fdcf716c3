//! Recipe record storage.
//!
//! A generation task writes exactly one record, under its own task id, when its
//! recipe is accepted. Later edits go through [`RecipeStore::update`].

use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{CombinedRecipe, PersistedRecipe, RecipeEdit, RecipeStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Recipe not found: {0}")]
    NotFound(Uuid),

    #[error("Recipe {0} already exists")]
    AlreadyExists(Uuid),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable recipe record: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait RecipeStore: Send + Sync + fmt::Debug {
    /// Insert a new record. Fails with `AlreadyExists` rather than overwrite.
    async fn save(&self, id: Uuid, recipe: CombinedRecipe) -> Result<PersistedRecipe, StoreError>;

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<PersistedRecipe>, StoreError>;

    async fn fetch_all(&self) -> Result<Vec<PersistedRecipe>, StoreError>;

    /// Apply a partial edit to an existing record.
    async fn update(&self, id: Uuid, edit: RecipeEdit) -> Result<PersistedRecipe, StoreError>;

    async fn set_status(
        &self,
        id: Uuid,
        status: RecipeStatus,
    ) -> Result<PersistedRecipe, StoreError> {
        let edit = RecipeEdit {
            status: Some(status),
            ..RecipeEdit::default()
        };
        self.update(id, edit).await
    }
}

/// Store kept in process memory, in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRecipeStore {
    records: RwLock<Vec<PersistedRecipe>>,
}

impl InMemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecipeStore for InMemoryRecipeStore {
    async fn save(&self, id: Uuid, recipe: CombinedRecipe) -> Result<PersistedRecipe, StoreError> {
        let mut records = self.records.write();
        if records.iter().any(|record| record.id == id) {
            return Err(StoreError::AlreadyExists(id));
        }
        let record = PersistedRecipe::from_combined(id, recipe);
        records.push(record.clone());
        Ok(record)
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<PersistedRecipe>, StoreError> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<PersistedRecipe>, StoreError> {
        Ok(self.records.read().clone())
    }

    async fn update(&self, id: Uuid, edit: RecipeEdit) -> Result<PersistedRecipe, StoreError> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.apply_edit(edit);
        Ok(record.clone())
    }
}

/// One pretty-printed JSON file per recipe, named `<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileRecipeStore {
    dir: PathBuf,
}

impl JsonFileRecipeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Unique per write, so concurrent writers never share a staging file.
    fn staging_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.{}.tmp", id, Uuid::new_v4().simple()))
    }

    async fn read_record(path: &Path) -> Result<Option<PersistedRecipe>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `body` to `staging`, removing the partial file if the write fails.
async fn write_staged(staging: &Path, body: &[u8]) -> Result<(), StoreError> {
    if let Err(e) = fs::write(staging, body).await {
        let _ = fs::remove_file(staging).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl RecipeStore for JsonFileRecipeStore {
    async fn save(&self, id: Uuid, recipe: CombinedRecipe) -> Result<PersistedRecipe, StoreError> {
        fs::create_dir_all(&self.dir).await?;
        let record = PersistedRecipe::from_combined(id, recipe);
        let body = serde_json::to_vec_pretty(&record)?;

        // the record only appears under its final name once fully written;
        // hard_link refuses an existing target, so nothing is overwritten
        let path = self.path_for(id);
        let staging = self.staging_path(id);
        write_staged(&staging, &body).await?;
        let published = fs::hard_link(&staging, &path).await;
        let _ = fs::remove_file(&staging).await;
        match published {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(id))
            }
            Err(e) => return Err(e.into()),
        }

        info!(%id, path = %path.display(), "recipe saved");
        Ok(record)
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<PersistedRecipe>, StoreError> {
        Self::read_record(&self.path_for(id)).await
    }

    async fn fetch_all(&self) -> Result<Vec<PersistedRecipe>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut recipes = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(recipe)) => recipes.push(recipe),
                Ok(None) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable recipe record")
                }
            }
        }
        recipes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        debug!(count = recipes.len(), dir = %self.dir.display(), "recipes loaded");
        Ok(recipes)
    }

    async fn update(&self, id: Uuid, edit: RecipeEdit) -> Result<PersistedRecipe, StoreError> {
        let path = self.path_for(id);
        let mut record = Self::read_record(&path)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        record.apply_edit(edit);

        // readers only ever see a complete file
        let staging = self.staging_path(id);
        write_staged(&staging, &serde_json::to_vec_pretty(&record)?).await?;
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }

        info!(%id, "recipe updated");
        Ok(record)
    }
}
