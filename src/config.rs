use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::api_connection::endpoints::DEFAULT_MODEL;

/// A fixed set of values and the relative weight of each one.
#[derive(Debug, Clone, Copy)]
pub struct Domain<T: 'static> {
    pub entries: &'static [(T, u32)],
}

impl<T: 'static> Domain<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|(value, _)| value)
    }

    /// Weights scaled so they sum to 1.
    pub fn normalized_weights(&self) -> Vec<f64> {
        let total: u32 = self.entries.iter().map(|(_, weight)| weight).sum();
        self.entries
            .iter()
            .map(|(_, weight)| f64::from(*weight) / f64::from(total.max(1)))
            .collect()
    }
}

pub const SERVINGS: Domain<u32> = Domain {
    entries: &[(1, 5), (2, 5), (3, 5), (4, 2), (5, 1), (6, 1), (7, 2)],
};

pub const DISH_TYPES: Domain<&str> = Domain {
    entries: &[("main", 5), ("side", 2), ("dessert", 1), ("appetizer", 1)],
};

pub const MAX_COOKING_MINUTES: Domain<u32> = Domain {
    entries: &[
        (10, 3),
        (20, 4),
        (30, 5),
        (40, 6),
        (50, 7),
        (60, 6),
        (70, 5),
        (80, 2),
        (90, 1),
        (100, 1),
        (110, 1),
        (120, 1),
    ],
};

pub const ALLERGIES: Domain<&str> = Domain {
    entries: &[("nuts", 4), ("dairy", 2), ("gluten", 2), ("soy", 1), ("seafood", 1)],
};

pub const DIET_REQUIREMENTS: Domain<&str> = Domain {
    entries: &[("vegetarian", 5), ("vegan", 3), ("gluten-free", 2), ("keto", 1)],
};

pub const CUISINES: Domain<&str> = Domain {
    entries: &[
        ("Italian", 5),
        ("Chinese", 3),
        ("Indian", 3),
        ("Mexican", 2),
        ("French", 1),
    ],
};

pub const DEFAULT_API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_PARSE_RETRIES: u32 = 10;
pub const DEFAULT_MAX_REALISM_ATTEMPTS: u32 = 20;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_STORE_DIR: &str = "recipes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenRouter,
    Fake,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "fake" => Ok(ProviderKind::Fake),
            other => Err(anyhow!("Unknown LLM provider: {}", other)),
        }
    }
}

/// Bounds that drive the generate-validate loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Gateway calls allowed per stage before a parse failure becomes fatal.
    pub parse_retry_limit: u32,
    /// Realism attempts before giving up; `None` loops until accepted.
    pub max_realism_attempts: Option<u32>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            parse_retry_limit: DEFAULT_PARSE_RETRIES,
            max_realism_attempts: Some(DEFAULT_MAX_REALISM_ATTEMPTS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderKind,
    pub api_key_env_var: String,
    pub model: String,
    pub store_dir: PathBuf,
    pub workers: usize,
    pub pipeline: PipelineSettings,
}

impl Settings {
    /// Read settings from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let provider = env_or("RECIPE_LLM_PROVIDER", ProviderKind::OpenRouter)?;
        let api_key_env_var = env::var("RECIPE_API_KEY_ENV")
            .unwrap_or_else(|_| DEFAULT_API_KEY_ENV_VAR.to_string());
        let model = env::var("RECIPE_LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let store_dir = env::var("RECIPE_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORE_DIR));
        let workers: usize = env_or("RECIPE_WORKERS", DEFAULT_WORKERS)?;
        let parse_retry_limit: u32 = env_or("RECIPE_PARSE_RETRIES", DEFAULT_PARSE_RETRIES)?;
        let max_realism_attempts: u32 =
            env_or("RECIPE_MAX_REALISM_ATTEMPTS", DEFAULT_MAX_REALISM_ATTEMPTS)?;

        if parse_retry_limit == 0 {
            return Err(anyhow!("RECIPE_PARSE_RETRIES must be at least 1"));
        }

        Ok(Self {
            provider,
            api_key_env_var,
            model,
            store_dir,
            workers: workers.max(1),
            pipeline: PipelineSettings {
                parse_retry_limit,
                // 0 disables the cap
                max_realism_attempts: (max_realism_attempts > 0).then_some(max_realism_attempts),
            },
        })
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid value '{}' for {}", raw, name)),
        Err(_) => Ok(default),
    }
}
