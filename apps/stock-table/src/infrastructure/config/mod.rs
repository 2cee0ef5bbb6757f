//! Configuration Module
//!
//! Configuration loading for the stock table service.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_BACKEND_URL, DEFAULT_UPDATE_EVENT, PipelineSettings, ServerSettings,
    SourceSettings, TableConfig,
};
