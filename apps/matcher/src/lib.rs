pub mod config;
pub mod db;
pub mod errors;
pub mod index;
pub mod llm_client;
pub mod matching;
pub mod models;
pub mod profiling;
pub mod provider;
pub mod state;
