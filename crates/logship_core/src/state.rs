//! Plugin state.
//!
//! Registry of live data source instances. Each instance owns its caches;
//! removing an instance drops them once the last handle is released.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::settings::InstanceSettings;
use crate::services::backend::Backend;
use crate::services::datasource::DataSource;
use crate::services::interpolate::TemplateSrv;

/// Live data source instances, keyed by instance id.
#[derive(Default)]
pub struct PluginState {
    datasources: RwLock<HashMap<Uuid, Arc<DataSource>>>,
}

impl PluginState {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a data source and register it, replacing any instance with
    /// the same id.
    pub fn create_datasource(
        &self,
        instance: InstanceSettings,
        backend: Arc<dyn Backend>,
        template_srv: Arc<dyn TemplateSrv>,
    ) -> Arc<DataSource> {
        let datasource = Arc::new(DataSource::new(instance, backend, template_srv));
        self.add_datasource(Arc::clone(&datasource));
        datasource
    }

    /// Register a data source.
    pub fn add_datasource(&self, datasource: Arc<DataSource>) {
        let id = datasource.id();
        tracing::debug!(datasource_id = %id, "Adding data source to state");
        self.datasources.write().insert(id, datasource);
    }

    /// Get a data source by id.
    pub fn get_datasource(&self, id: &Uuid) -> Option<Arc<DataSource>> {
        self.datasources.read().get(id).cloned()
    }

    /// Remove a data source and release its caches.
    pub fn remove_datasource(&self, id: &Uuid) -> Option<Arc<DataSource>> {
        let removed = self.datasources.write().remove(id);
        if removed.is_some() {
            tracing::debug!(datasource_id = %id, "Removed data source from state");
        }
        removed
    }

    /// Ids of all registered data sources.
    pub fn datasource_ids(&self) -> Vec<Uuid> {
        self.datasources.read().keys().copied().collect()
    }

    /// Number of registered data sources.
    pub fn len(&self) -> usize {
        self.datasources.read().len()
    }

    /// Check if no data source is registered.
    pub fn is_empty(&self) -> bool {
        self.datasources.read().is_empty()
    }
}
