//! Configuration and logging helpers shared by the llmkit crates.
//!
//! # Modules
//!
//! ## Config (`config`)
//!
//! Environment variable lookup and YAML/JSON settings files:
//!
//! ```rust,ignore
//! use utils::config::{find_config_file, get_env_parse, load_config_file};
//!
//! let timeout = get_env_parse::<u64>("LLMKIT_TIMEOUT_SECS")?;
//! if let Some(path) = find_config_file("llmkit") {
//!     let settings: MySettings = load_config_file(path)?;
//! }
//! ```
//!
//! ## Logging (`logging`)
//!
//! One-call `tracing` subscriber setup honouring `RUST_LOG`:
//!
//! ```rust,ignore
//! utils::logging::init_tracing("info");
//! ```

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, UtilsError};

pub use config::{
    config_search_dirs, find_config_file, get_env, get_env_nonempty, get_env_parse, load_config_file,
    load_json_config, load_yaml_config,
};
pub use logging::init_tracing;
