pub mod api_connection;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod nutrition_annotator;
pub mod orchestrator;
pub mod randomizer;
pub mod realism_validator;
pub mod recipe_synthesizer;
pub mod response_parser;
pub mod store;
pub mod task_queue;
pub mod telemetry;
