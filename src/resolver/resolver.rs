use super::cache::{Lookup, ReferenceCache, SharedFetch};
use super::fetcher::OptionsFetcher;
use crate::core::{CollectionKind, Entity, GridError, ResolverKey, Result};
use crate::projection::TitleLookup;
use crate::schema::LinkValue;
use futures::FutureExt;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Turns reference ids into entities through a shared [`ReferenceCache`].
///
/// Concurrent `resolve` calls for the same collection share one fetch. The
/// fetch runs on its own Tokio task, so a caller that goes away mid-flight
/// does not cancel it and the next caller finds the result cached.
#[derive(Clone)]
pub struct ReferenceResolver {
    cache: Arc<ReferenceCache>,
    fetcher: Arc<dyn OptionsFetcher>,
}

impl ReferenceResolver {
    pub fn new(cache: Arc<ReferenceCache>, fetcher: Arc<dyn OptionsFetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    /// All entities of a collection, fetched at most once per freshness window.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn resolve(&self, catalog: &str, kind: CollectionKind) -> Result<Arc<[Entity]>> {
        self.resolve_key(&ResolverKey::new(catalog, kind)).await
    }

    pub async fn resolve_key(&self, key: &ResolverKey) -> Result<Arc<[Entity]>> {
        let lookup = self
            .cache
            .lookup_or_start(key, |generation| self.start_fetch(key.clone(), generation));

        match lookup {
            Lookup::Fresh(entities) => Ok(entities),
            Lookup::Pending(fetch) => {
                event!(Level::DEBUG, collection = %key, "joined in-flight fetch");
                fetch.await
            }
            Lookup::Started(fetch) => fetch.await,
        }
    }

    fn start_fetch(&self, key: ResolverKey, generation: u64) -> SharedFetch {
        let span = info_span!(
            "resolver.fetch",
            catalog = %key.catalog,
            kind = %key.kind,
            generation
        );

        let fetcher = Arc::clone(&self.fetcher);
        let cache = Arc::clone(&self.cache);
        let task_key = key.clone();
        let handle = tokio::spawn(
            async move {
                let outcome = fetcher.fetch_options(&task_key.catalog, task_key.kind).await;
                match &outcome {
                    Ok(entities) => {
                        event!(Level::DEBUG, count = entities.len(), "options fetched")
                    }
                    Err(err) => event!(Level::WARN, error = %err, "options fetch failed"),
                }
                cache.complete(&task_key, generation, outcome)
            }
            .instrument(span),
        );

        let cache = Arc::clone(&self.cache);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    cache.abandon(&key, generation);
                    event!(Level::ERROR, collection = %key, error = %join_err, "fetch task died");
                    Err(GridError::TaskFailed(join_err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Title of `id` from the cached collection, or `id` itself.
    ///
    /// Never fetches and never fails.
    pub fn title_of(&self, catalog: &str, kind: CollectionKind, id: &str) -> String {
        TitleLookup::title_of(self, &ResolverKey::new(catalog, kind), id)
    }

    pub fn entity_of(&self, catalog: &str, kind: CollectionKind, id: &str) -> Option<Entity> {
        self.cache
            .entry(&ResolverKey::new(catalog, kind))
            .and_then(|entry| entry.find(id).cloned())
    }

    /// Resolve the collection, then return the title of `id`.
    ///
    /// A failed fetch degrades to the raw id.
    pub async fn resolve_title(&self, catalog: &str, kind: CollectionKind, id: &str) -> String {
        match self.resolve(catalog, kind).await {
            Ok(entities) => entities
                .iter()
                .find(|entity| entity.id == id)
                .map(|entity| entity.label().to_string())
                .unwrap_or_else(|| id.to_string()),
            Err(err) => {
                event!(Level::WARN, catalog, error = %err, "title resolution fell back to id");
                id.to_string()
            }
        }
    }

    /// The link with `title` filled in; display-ready links are returned as is
    pub async fn resolve_link(&self, link: &LinkValue) -> Result<LinkValue> {
        if link.is_display_ready() {
            return Ok(link.clone());
        }

        let key = link.resolver_key().ok_or_else(|| {
            GridError::InvalidSchema(format!("link domain '{}' is not resolvable", link.domain))
        })?;
        let entities = self.resolve_key(&key).await?;

        let mut resolved = link.clone();
        resolved.title = entities
            .iter()
            .find(|entity| entity.id == link.id)
            .and_then(|entity| entity.title.clone());
        Ok(resolved)
    }

    /// Resolve several collections concurrently
    pub async fn prefetch<I>(&self, keys: I) -> Vec<(ResolverKey, Result<Arc<[Entity]>>)>
    where
        I: IntoIterator<Item = ResolverKey>,
    {
        let keys: Vec<ResolverKey> = keys.into_iter().collect();
        let results = join_all(keys.iter().map(|key| self.resolve_key(key))).await;
        keys.into_iter().zip(results).collect()
    }

    /// Drop cached collections after a mutation may have changed them.
    ///
    /// See [`ReferenceCache::invalidate`] for the argument combinations.
    pub fn invalidate(&self, catalog: Option<&str>, kind: Option<CollectionKind>) -> usize {
        let removed = self.cache.invalidate(catalog, kind);
        event!(
            Level::INFO,
            catalog = catalog.unwrap_or("*"),
            kind = %kind.map(|k| k.to_string()).unwrap_or_else(|| "*".to_string()),
            removed,
            "reference cache invalidated"
        );
        removed
    }
}

impl TitleLookup for ReferenceResolver {
    fn lookup_title(&self, key: &ResolverKey, id: &str) -> Option<String> {
        self.cache
            .entry(key)
            .and_then(|entry| entry.find(id).map(|entity| entity.label().to_string()))
    }
}
