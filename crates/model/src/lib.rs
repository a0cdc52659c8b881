//! Modelplex provider adapters and model registry.
//!
//! Each supported upstream API family (OpenAI, Anthropic, Ollama) has an
//! adapter implementing [`mcore::Adapter`]; [`Provider`] dispatches over
//! them, and [`Registry`] maps model ids to the provider serving them.

pub use claude::Claude;
pub use config::{ProviderConfig, ProviderKind};
pub use http::HttpProvider;
pub use ollama::Ollama;
pub use openai::OpenAI;
pub use provider::{Provider, build_provider};
pub use registry::{ModelDescriptor, Registry};
pub use reqwest::Client;

pub mod claude;
pub mod codec;
pub mod config;
pub mod http;
pub mod ollama;
pub mod openai;
mod provider;
mod registry;
