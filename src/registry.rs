use std::{collections::HashMap, sync::Arc};

use serde_json::Value;

use crate::form_data::FormData;

/// Translates form data into a backend query payload.
///
/// Builders are pure and synchronous; one is registered per chart type. Any
/// `Fn(&FormData) -> Value` closure implements the trait.
pub trait QueryBuilder: Send + Sync {
    fn build(&self, form_data: &FormData) -> Value;
}

impl<F> QueryBuilder for F
where
    F: Fn(&FormData) -> Value + Send + Sync,
{
    fn build(&self, form_data: &FormData) -> Value {
        self(form_data)
    }
}

/// Lookup table of [`QueryBuilder`]s keyed by chart type.
///
/// Populated once at startup and shared read-only between orchestrations.
#[derive(Default, Clone)]
pub struct QueryBuilderRegistry {
    builders: HashMap<String, Arc<dyn QueryBuilder>>,
}

impl QueryBuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, viz_type: impl Into<String>, builder: Arc<dyn QueryBuilder>) {
        self.builders.insert(viz_type.into(), builder);
    }

    pub fn get(&self, viz_type: &str) -> Option<&Arc<dyn QueryBuilder>> {
        self.builders.get(viz_type)
    }

    pub fn contains(&self, viz_type: &str) -> bool {
        self.builders.contains_key(viz_type)
    }

    /// List all registered chart types.
    pub fn chart_types(&self) -> Vec<&str> {
        self.builders.keys().map(|key| key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}
