pub mod config;
pub mod engine;
pub mod types;

pub use config::OperatorConfig;
pub use engine::{EngineError, EngineProfile, EngineType};
pub use types::*;
