//! Configuration loading and management.

mod file;
mod paths;
mod resolve;
mod run;
mod types;
mod validate;

pub use file::{
    load_config_file, load_default_config, load_layered, save_config, save_default_config,
};
pub use paths::{config_dir, config_file_path};
pub use resolve::{Resolved, resolve_settings};
pub use run::{Action, DispatchMode, InputSpec, RunConfig, Settings};
pub use types::{
    Config, DetectionConfig, InputConfig, LoggingConfig, OutputConfig, ProcessingConfig,
};
pub use validate::validate_run_config;
