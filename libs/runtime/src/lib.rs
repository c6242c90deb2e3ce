//! Process-level plumbing shared by the obras binaries: layered configuration,
//! home directory resolution and logging setup.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, ApiConfig, AppConfig, CliArgs, ClientConfig, Environment,
    LoggingConfig, Section,
};
