use crate::core::{CollectionKind, Entity, GridError, ResolverKey, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Source of collection options, supplied by the surrounding application
/// (catalog and list HTTP services in production).
///
/// Failures should be reported as [`GridError::FetchFailed`]; they are handed
/// unchanged to every caller waiting on the fetch.
#[async_trait]
pub trait OptionsFetcher: Send + Sync {
    async fn fetch_options(&self, catalog: &str, kind: CollectionKind) -> Result<Vec<Entity>>;
}

/// Fixed in-memory collections
#[derive(Debug, Clone, Default)]
pub struct StaticOptions {
    collections: HashMap<ResolverKey, Vec<Entity>>,
}

#[derive(Deserialize)]
struct CollectionDocument {
    catalog: String,
    kind: CollectionKind,
    #[serde(default)]
    entities: Vec<Entity>,
}

impl StaticOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, catalog: &str, kind: CollectionKind, entities: Vec<Entity>) -> Self {
        self.insert(catalog, kind, entities);
        self
    }

    pub fn insert(&mut self, catalog: &str, kind: CollectionKind, entities: Vec<Entity>) {
        self.collections
            .insert(ResolverKey::new(catalog, kind), entities);
    }

    /// Parse `[{"catalog": "...", "kind": "catalog" | "list", "entities": [...]}]`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let documents: Vec<CollectionDocument> = serde_json::from_str(json)?;
        let mut options = Self::new();
        for doc in documents {
            options.insert(&doc.catalog, doc.kind, doc.entities);
        }
        Ok(options)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[async_trait]
impl OptionsFetcher for StaticOptions {
    async fn fetch_options(&self, catalog: &str, kind: CollectionKind) -> Result<Vec<Entity>> {
        self.collections
            .get(&ResolverKey::new(catalog, kind))
            .cloned()
            .ok_or_else(|| GridError::FetchFailed {
                catalog: catalog.to_string(),
                kind,
                message: "unknown collection".to_string(),
            })
    }
}
