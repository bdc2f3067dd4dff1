//! Named endpoints a remote client can bind to.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::ports::Dispatcher;

#[derive(Default)]
pub struct EndpointRegistry {
    endpoints: RwLock<HashMap<String, Arc<dyn Dispatcher>>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `dispatcher` under `name`, replacing any previous binding.
    pub async fn bind(&self, name: impl Into<String>, dispatcher: Arc<dyn Dispatcher>) {
        let name = name.into();
        tracing::info!(endpoint = %name, "endpoint bound");
        self.endpoints.write().await.insert(name, dispatcher);
    }

    pub async fn lookup(&self, name: &str) -> Option<Arc<dyn Dispatcher>> {
        self.endpoints.read().await.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.endpoints.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}
