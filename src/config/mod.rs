//! Configuration system
//!
//! - `macros`: `config_struct!` for single-declaration sections with defaults
//! - `schemas`: every section of config.toml
//! - `utils`: loading, environment overrides, `with_config` access

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{
    apply_env_overrides, get_config_clone, is_config_initialized, load_config,
    load_config_from_path, parse_config, read_config_file, resolve_config_path, validate_config,
    with_config, write_default_config,
};
