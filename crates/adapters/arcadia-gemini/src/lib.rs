pub mod client;
pub mod config;
pub mod wire;

pub use client::{GeminiError, GeminiGenerator};
pub use config::GeminiConfig;
