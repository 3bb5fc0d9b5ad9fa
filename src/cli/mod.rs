//! CLI-specific functionality for reachout
//!
//! This module contains argument parsing and configuration discovery.

pub mod args;
pub mod config;

pub use args::{
    Args, EvaluateConfig, ExecutionMode, GenerateConfig, GlobalOptions, OutreachConfig,
};
pub use config::{AppConfig, ConfigDiscovery, ConfigError};
