mod engine;

pub use engine::{default_data_dir, EngineConfig, LogLevel};
