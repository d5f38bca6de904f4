//! On-device LLM provider implementation.
//!
//! Runs a quantised GGUF model on the local machine through the llama.cpp
//! command-line binary. No API key is needed, but a weight file must exist:
//! construction fails if none can be found.

pub mod on_device;

pub use on_device::{resolve_model_path, OnDeviceProvider};
