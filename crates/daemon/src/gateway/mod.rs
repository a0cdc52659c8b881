//! The gateway: shared state, request routing, and the unix socket
//! listener.

use crate::config::ServerConfig;
use mcore::Adapter;
use model::{Provider, Registry};
use std::{sync::Arc, time::Duration};

pub mod router;
pub mod serve;
pub mod uds;

/// Chunks buffered between an upstream stream and the caller.
const STREAM_BUFFER: usize = 32;

/// Per-request limits taken from `[server]`.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Bound on a non-streaming call and on the gap between chunks.
    pub request_timeout: Duration,
    /// Largest accepted request body, in bytes.
    pub max_request_size: usize,
    /// Capacity of the producer/consumer channel of a stream.
    pub stream_buffer: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for Limits {
    fn from(server: &ServerConfig) -> Self {
        Self {
            request_timeout: server.request_timeout(),
            max_request_size: server.max_request_size,
            stream_buffer: STREAM_BUFFER,
        }
    }
}

/// Process-wide state shared by the listener and the router. Read-only
/// after startup.
pub struct Gateway<A: Adapter = Provider> {
    /// Model routing table.
    pub registry: Arc<Registry<A>>,
    /// Per-request limits.
    pub limits: Limits,
}

impl<A: Adapter> Gateway<A> {
    /// Wrap a registry.
    pub fn new(registry: Registry<A>, limits: Limits) -> Self {
        Self {
            registry: Arc::new(registry),
            limits,
        }
    }
}

impl<A: Adapter> Clone for Gateway<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            limits: self.limits,
        }
    }
}
