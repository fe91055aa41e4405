use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use imitra_ai::{Classifier, LlmClient};
use imitra_notify::{Gateway, Hub};
use imitra_store::{MemoryStore, Store};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::middleware::RateLimiter;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn Store>,
    pub classifier: Classifier,
    pub hub: Hub,
    pub gateway: Gateway,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn Store>,
        classifier: Classifier,
        gateway: Gateway,
    ) -> Self {
        let limiter = RateLimiter::new(
            config.rate_limit_capacity,
            config.rate_limit_refill_per_sec,
            config.rate_limit_max_clients,
        );
        Self {
            config: Arc::new(config),
            store,
            classifier,
            hub: Hub::default(),
            gateway,
            limiter: Arc::new(limiter),
        }
    }

    /// Wire up storage, the classifier and the gateway from configuration.
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let store = open_store(&config)?;
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let classifier = match &config.ai {
            Some(ai) => {
                let client = LlmClient::new(ai.clone()).context("building LLM client")?;
                info!(model = %ai.model, "LLM classification enabled");
                Classifier::with_generator(Arc::new(client))
            }
            None => {
                info!("no LLM configured, using keyword classification");
                Classifier::keyword_only()
            }
        };

        let gateway = match &config.gateway_url {
            Some(url) => Gateway::new(url, timeout).context("building gateway client")?,
            None => {
                warn!("no email/SMS gateway configured, outbound messages will only be logged");
                Gateway::disabled()
            }
        };

        Ok(Self::new(config, store, classifier, gateway))
    }
}

#[cfg(feature = "duckdb")]
fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn Store>> {
    match &config.database {
        Some(path) => {
            let store = imitra_store::DuckStore::open_persistent(path)
                .with_context(|| format!("opening {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(not(feature = "duckdb"))]
fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn Store>> {
    if let Some(path) = &config.database {
        anyhow::bail!(
            "database {} requested but this build has no duckdb support",
            path.display()
        );
    }
    info!("using in-memory storage");
    Ok(Arc::new(MemoryStore::new()))
}
