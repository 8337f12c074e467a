use crate::core::{EngineConfig, GridError, ResolverKey, Result};
use crate::projection::{
    ActionCapabilities, ClassifiedProperty, ColumnDescriptor, DescriptorGenerator, FieldDescriptor,
    PropertyClassifier,
};
use crate::resolver::{OptionsFetcher, ReferenceCache, ReferenceResolver};
use crate::schema::{Diagnostic, NormalizedSchema, SchemaNormalizer};
use crate::table::TableController;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Everything one schema projects into
#[derive(Debug, Clone)]
pub struct Projection {
    pub schema: NormalizedSchema,
    pub properties: Vec<ClassifiedProperty>,
    pub columns: Vec<ColumnDescriptor>,
    pub fields: Vec<FieldDescriptor>,
    /// Merge conflicts followed by skipped properties
    pub diagnostics: Vec<Diagnostic>,
}

impl Projection {
    /// Distinct collections the projected references point at, in column order
    pub fn resolver_keys(&self) -> Vec<ResolverKey> {
        let mut seen = BTreeSet::new();
        self.columns
            .iter()
            .filter_map(|column| column.resolver_key.clone())
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}

/// Schema in, descriptors out.
///
/// One engine serves every schema of an application. The resolver, and with
/// it the reference cache, is shared by all projections made here.
///
/// ```
/// use schemagrid::{EngineConfig, ProjectionEngine, StaticOptions};
/// use std::sync::Arc;
///
/// let engine = ProjectionEngine::new(EngineConfig::default(), Arc::new(StaticOptions::new())).unwrap();
/// let projection = engine.project(
///     &serde_json::json!({"properties": {"name": {"type": "string"}}}),
///     None,
/// );
/// assert_eq!(projection.columns.len(), 1);
/// ```
pub struct ProjectionEngine {
    config: EngineConfig,
    normalizer: SchemaNormalizer,
    classifier: PropertyClassifier,
    generator: DescriptorGenerator,
    resolver: ReferenceResolver,
}

impl ProjectionEngine {
    pub fn new(config: EngineConfig, fetcher: Arc<dyn OptionsFetcher>) -> Result<Self> {
        let cache = Arc::new(ReferenceCache::from_config(&config));
        Self::with_cache(config, fetcher, cache)
    }

    /// Build an engine over an existing cache, e.g. one shared with another engine
    pub fn with_cache(
        config: EngineConfig,
        fetcher: Arc<dyn OptionsFetcher>,
        cache: Arc<ReferenceCache>,
    ) -> Result<Self> {
        config.validate().map_err(GridError::Config)?;

        Ok(Self {
            normalizer: SchemaNormalizer::new(config.merge_policy),
            classifier: PropertyClassifier::new(config.reference_marker.clone()),
            generator: DescriptorGenerator::new(config.widths.clone()),
            resolver: ReferenceResolver::new(cache, fetcher),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Normalize, classify and generate in one synchronous pass
    pub fn project(&self, schema: &JsonValue, actions: Option<ActionCapabilities>) -> Projection {
        let schema = self.normalizer.normalize(schema);
        let classification = self.classifier.classify_schema(&schema);

        let columns = self.generator.generate_columns(
            classification.projectable(),
            self.config.editable_default,
            actions,
        );
        let fields = self
            .generator
            .generate_fields(classification.projectable(), self.config.editable_default);

        let mut diagnostics = schema.diagnostics().to_vec();
        diagnostics.extend(classification.diagnostics);

        Projection {
            schema,
            properties: classification.properties,
            columns,
            fields,
            diagnostics,
        }
    }

    /// A controller over the projection's columns
    pub fn table(&self, projection: &Projection) -> TableController {
        TableController::new(projection.columns.clone())
    }

    /// Warm the cache for every collection the projection references.
    ///
    /// Returns the number of collections that failed to resolve.
    pub async fn prefetch(&self, projection: &Projection) -> usize {
        self.resolver
            .prefetch(projection.resolver_keys())
            .await
            .iter()
            .filter(|(_, result)| result.is_err())
            .count()
    }
}
