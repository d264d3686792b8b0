use std::sync::Arc;
use std::time::SystemTime;

use anyhow::Result;

use crate::database::MetricStore;
use crate::database::models::Endpoint;

/// Endpoints that are always monitored, registered on first use.
pub const DEFAULT_ENDPOINTS: [&str; 2] = ["https://delfi.lt", "https://google.com"];

/// The set of endpoints under monitoring.
///
/// Backed entirely by the persistence port; the built-in seed list is
/// (re)applied before every listing, which is a no-op once present thanks
/// to the store's unique-URL semantics.
pub struct EndpointRegistry {
    store: Arc<dyn MetricStore>,
    seeds: Vec<String>,
}

impl EndpointRegistry {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self::with_seeds(store, DEFAULT_ENDPOINTS.iter().map(ToString::to_string).collect())
    }

    /// Registry with a caller-supplied seed list.
    pub fn with_seeds(store: Arc<dyn MetricStore>, seeds: Vec<String>) -> Self {
        Self { store, seeds }
    }

    /// All registered endpoints, after idempotent seeding.
    pub async fn list(&self) -> Result<Vec<Endpoint>> {
        self.seed().await?;
        self.store.list_endpoints().await
    }

    /// Register an endpoint. Returns true if it was newly added; a
    /// duplicate URL is a benign no-op reported as false.
    pub async fn add(&self, url: &str) -> Result<bool> {
        let newly_added = self.store.add_endpoint(url, SystemTime::now()).await?;
        if !newly_added {
            tracing::debug!(url, "endpoint already registered");
        }
        Ok(newly_added)
    }

    async fn seed(&self) -> Result<()> {
        let now = SystemTime::now();
        for url in &self.seeds {
            if self.store.add_endpoint(url, now).await? {
                tracing::info!(url = url.as_str(), "registered built-in endpoint");
            }
        }
        Ok(())
    }
}
