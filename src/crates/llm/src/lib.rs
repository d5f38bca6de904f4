//! Text-generation backends behind one capability contract.
//!
//! Every backend implements [`LlmProvider`]: blocking and streaming
//! generation, token counting, model listing and context-window lookup.
//!
//! # Remote Providers
//!
//! - **OpenAI** - chat-completions protocol
//! - **Anthropic** - messages protocol
//! - **Hugging Face** - text-generation inference protocol
//!
//! # Local Provider
//!
//! - **On-device** - llama.cpp running a local GGUF weight file
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use llm::{create_provider, GenerateOptions, LlmSettings, ProviderKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = LlmSettings::from_env();
//!     let provider = create_provider(ProviderKind::Anthropic, &settings)?;
//!
//!     let response = provider
//!         .generate(
//!             "Explain quantum computing briefly",
//!             GenerateOptions::new().with_system_message("You are a physics tutor"),
//!         )
//!         .await?;
//!     println!("{}", response.text);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod local;
pub mod provider;
pub mod registry;
pub mod remote;
pub mod settings;
pub mod sse;
pub mod tokens;

// Re-export commonly used types
pub use config::{LocalLlmConfig, RemoteLlmConfig};
pub use error::{LlmError, Result};
pub use factory::{create_provider, ProviderKind};
pub use local::OnDeviceProvider;
pub use provider::{GenerateOptions, LlmProvider, LlmResponse, TextStream, Usage, DEFAULT_TEMPERATURE};
pub use registry::ModelRegistry;
pub use remote::{AnthropicProvider, HuggingFaceProvider, OpenAiProvider};
pub use settings::{BackendSettings, LlmSettings};
pub use tokens::TokenCounter;
