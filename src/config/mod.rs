//! Configuration module - layered settings loading and validation

pub mod settings;

pub use settings::{
    FallbackConfig, GenerationConfig, LoggingConfig, PollingConfig, PreprocessConfig,
    ServiceConfig, Settings, StorageConfig,
};
