//! `Registry`: immutable map from model id to the provider serving it.
//!
//! Built once at startup and shared read-only afterwards, so lookups take
//! no locks. Listing order is the adapters' order followed by each
//! adapter's own model order.

use crate::{Provider, ProviderConfig, build_provider};
use anyhow::{Context, Result, bail};
use compact_str::CompactString;
use mcore::{Adapter, Error, ModelList, ModelObject};
use std::{collections::HashMap, time::Duration};

/// Upper bound for establishing a connection to any upstream.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A registered model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Model id, unique across the registry.
    pub id: CompactString,
    /// Name of the owning provider.
    pub provider: CompactString,
    /// Index of the owning adapter, in listing order.
    pub slot: usize,
}

/// Static model routing table.
#[derive(Clone)]
pub struct Registry<A: Adapter = Provider> {
    adapters: Vec<A>,
    models: Vec<ModelDescriptor>,
    index: HashMap<CompactString, usize>,
}

impl<A: Adapter> Registry<A> {
    /// Register every model of every adapter, in order.
    ///
    /// Fails with [`Error::DuplicateModel`] when two registrations claim
    /// the same id, including one adapter listing an id twice.
    pub fn new(adapters: Vec<A>) -> mcore::Result<Self> {
        let mut models = Vec::new();
        let mut index = HashMap::new();
        for (slot, adapter) in adapters.iter().enumerate() {
            for id in adapter.models() {
                if let Some(&prev) = index.get(id) {
                    let first: &ModelDescriptor = &models[prev];
                    return Err(Error::DuplicateModel {
                        model: id.clone(),
                        first: first.provider.clone(),
                        second: adapter.name().into(),
                    });
                }
                index.insert(id.clone(), models.len());
                models.push(ModelDescriptor {
                    id: id.clone(),
                    provider: adapter.name().into(),
                    slot,
                });
            }
        }
        Ok(Self {
            adapters,
            models,
            index,
        })
    }

    /// Every registered model, in listing order.
    pub fn list(&self) -> &[ModelDescriptor] {
        &self.models
    }

    /// Find the adapter serving `model`. Exact match only.
    pub fn resolve(&self, model: &str) -> mcore::Result<&A> {
        self.descriptor(model)
            .map(|d| &self.adapters[d.slot])
            .ok_or_else(|| Error::UnknownModel(model.into()))
    }

    /// Find the descriptor of `model`. Exact match only.
    pub fn descriptor(&self, model: &str) -> Option<&ModelDescriptor> {
        self.index.get(model).map(|&i| &self.models[i])
    }

    /// The `/v1/models` payload.
    pub fn model_list(&self) -> ModelList {
        self.models
            .iter()
            .map(|d| ModelObject::new(d.id.as_str(), d.provider.as_str()))
            .collect()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Registry<Provider> {
    /// Build every configured provider and register its models.
    ///
    /// Providers are ordered by ascending priority; ties keep config
    /// order. All providers share one connection pool.
    pub fn from_configs(configs: &[ProviderConfig]) -> Result<Self> {
        if configs.is_empty() {
            bail!("at least one provider must be configured");
        }

        let mut ordered: Vec<&ProviderConfig> = configs.iter().collect();
        ordered.sort_by_key(|c| c.priority);

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        let mut providers = Vec::with_capacity(ordered.len());
        for config in ordered {
            if config.kind.requires_key() && config.api_key.is_empty() {
                tracing::warn!(
                    "provider '{}' ({}) has no api key; upstream calls will likely be rejected",
                    config.name,
                    config.kind
                );
            }
            let provider = build_provider(config, client.clone())
                .with_context(|| format!("invalid provider '{}'", config.name))?;
            tracing::debug!(
                "registered provider '{}' ({}) at {} with {} model(s)",
                config.name,
                config.kind,
                provider.endpoint(),
                config.models.len()
            );
            providers.push(provider);
        }

        Ok(Self::new(providers)?)
    }
}
