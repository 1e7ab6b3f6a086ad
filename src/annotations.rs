use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::{error::Error, form_data::AnnotationLayerMetadata};

/// Result data for the annotation layers of one chart, keyed by layer name.
pub type AnnotationData = HashMap<String, Value>;

/// Resolves the data of one annotation layer.
///
/// Sources are registered per layer `sourceType`. This crate ships no
/// built-in sources; the registry exists as an extension point, and a layer
/// naming an unregistered source type fails with
/// [`Error::NotImplemented`](crate::Error::NotImplemented).
#[async_trait]
pub trait AnnotationSource: Send + Sync {
    async fn load(&self, layer: &AnnotationLayerMetadata) -> Result<Value, Error>;
}

/// Lookup table of [`AnnotationSource`]s keyed by layer source type.
#[derive(Default, Clone)]
pub struct AnnotationSourceRegistry {
    sources: HashMap<String, Arc<dyn AnnotationSource>>,
}

impl AnnotationSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source_type: impl Into<String>, source: Arc<dyn AnnotationSource>) {
        self.sources.insert(source_type.into(), source);
    }

    pub fn get(&self, source_type: &str) -> Option<&Arc<dyn AnnotationSource>> {
        self.sources.get(source_type)
    }

    pub fn contains(&self, source_type: &str) -> bool {
        self.sources.contains_key(source_type)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticSource(Value);

    #[async_trait]
    impl AnnotationSource for StaticSource {
        async fn load(&self, _layer: &AnnotationLayerMetadata) -> Result<Value, Error> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn registered_source_is_dispatched_by_type() {
        let mut registry = AnnotationSourceRegistry::new();
        assert!(registry.is_empty());
        registry.register("NATIVE", Arc::new(StaticSource(json!({"records": []}))));

        assert!(registry.contains("NATIVE"));
        assert!(registry.get("line").is_none());

        let layer = AnnotationLayerMetadata::new("holidays").with_source_type("NATIVE");
        let data = registry.get("NATIVE").unwrap().load(&layer).await.unwrap();
        assert_eq!(data, json!({"records": []}));
    }
}
