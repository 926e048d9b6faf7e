//! Configuration file loading for magi-quorum
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables: `MAGI_<SECTION>__<KEY>`
//! 2. `--config <path>` specified file
//! 3. Project root: `./magi.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/magi-quorum/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, DEFAULT_SECRET, FileAggregatorConfig, FileConfig, FileDispatchConfig,
    FileGatewayConfig, FileJudgeConfig, FileProviderConfig, FileWorkersConfig, default_panel,
};
pub use loader::ConfigLoader;
