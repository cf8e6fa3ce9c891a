use crate::error::Result;
use crate::mapping::FeatureTypeMapping;
use crate::name::QName;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Source of the feature type mappings that nested attribute mappings refer to.
///
/// Failures to reach a mapping's backing store are reported as [`crate::Error::NestedTypeUnavailable`].
pub trait MappingRegistry: Send + Sync {
    fn mapping(&self, name: &QName) -> Result<Option<Arc<FeatureTypeMapping>>>;
}

/// Mappings loaded once and then read concurrently.
#[derive(Default)]
pub struct InMemoryRegistry {
    mappings: DashMap<QName, Arc<FeatureTypeMapping>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self { Self { mappings: DashMap::new() } }

    pub fn register(&self, mapping: FeatureTypeMapping) -> Arc<FeatureTypeMapping> {
        let mapping = Arc::new(mapping);
        debug!("registering mapping for {}", mapping.name());
        self.mappings.insert(mapping.name().clone(), mapping.clone());
        mapping
    }

    pub fn len(&self) -> usize { self.mappings.len() }

    pub fn is_empty(&self) -> bool { self.mappings.is_empty() }
}

impl MappingRegistry for InMemoryRegistry {
    fn mapping(&self, name: &QName) -> Result<Option<Arc<FeatureTypeMapping>>> { Ok(self.mappings.get(name).map(|entry| entry.value().clone())) }
}

impl<R: MappingRegistry + ?Sized> MappingRegistry for Arc<R> {
    fn mapping(&self, name: &QName) -> Result<Option<Arc<FeatureTypeMapping>>> { (**self).mapping(name) }
}
