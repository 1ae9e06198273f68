//! Shared service state.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::converter::Converter;
use crate::render::RenderEngine;
use crate::store::ArtifactStore;

/// Shared service state.
///
/// Holds the artifact store, the converter writing to it and the loaded
/// configuration. The store is the only mutable state shared between requests.
pub struct ServiceState<S: ArtifactStore + 'static> {
    /// Artifact store backing conversions, downloads and listings.
    pub store: Arc<S>,
    /// Converter bound to `store`.
    pub converter: Converter<S>,
    /// Loaded configuration.
    pub config: Arc<ServiceConfig>,
}

impl<S: ArtifactStore + 'static> ServiceState<S> {
    /// Create service state around a store and render engine.
    pub fn new(store: S, engine: Arc<dyn RenderEngine>, config: ServiceConfig) -> Self {
        Self::with_shared_store(Arc::new(store), engine, config)
    }

    /// Create service state around a store that is also used elsewhere
    /// (for example by the sweeper).
    pub fn with_shared_store(
        store: Arc<S>,
        engine: Arc<dyn RenderEngine>,
        config: ServiceConfig,
    ) -> Self {
        let converter = Converter::new(Arc::clone(&store), engine, config.conversion_settings());
        Self {
            store,
            converter,
            config: Arc::new(config),
        }
    }
}

impl<S: ArtifactStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            converter: self.converter.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FixedRasterEngine;
    use crate::store::InMemoryArtifactStore;

    #[test]
    fn test_converter_shares_store() {
        let config = ServiceConfig {
            max_upload_bytes: 2048,
            ..ServiceConfig::default()
        };
        let state = ServiceState::new(
            InMemoryArtifactStore::new(),
            Arc::new(FixedRasterEngine::new(1, 1)),
            config,
        );

        assert!(Arc::ptr_eq(&state.store, state.converter.store()));
        assert_eq!(state.converter.settings().max_upload_bytes, 2048);

        let cloned = state.clone();
        assert!(Arc::ptr_eq(&state.store, &cloned.store));
    }
}
