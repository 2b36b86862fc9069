//! Wraith - indicator snapshot cache and signal engine for exchange candles

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use services::CacheOrchestrator;
pub use types::*;
