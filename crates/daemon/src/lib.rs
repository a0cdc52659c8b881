//! Modelplex daemon: serves the OpenAI-compatible API on a unix domain
//! socket and routes each request to the provider that owns its model.

pub mod cli;
pub mod config;
pub mod gateway;
pub mod utils;

pub use cli::App;
pub use config::{DaemonConfig, ServerConfig};
pub use gateway::{
    Gateway, Limits,
    router::{Phase, Relay, Reply},
    serve::{ServeHandle, serve, serve_gateway},
};
