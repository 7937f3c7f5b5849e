//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for the reminder service:
//! lead time, delivery sink, the acting user and the tasks to seed.

mod error;
mod yaml;

pub use error::ConfigError;
pub use yaml::{NudgeConfig, SeedTask, SinkConfig, UserConfig, YamlLoader};
