use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{
    common::{FetchError, SourceMatch},
    sources::{AudioResolver, CatalogService},
};

/// Turns a catalog track id into a downloadable source.
///
/// Lookups are memoized for `ttl`; a zero `ttl` resolves every call afresh.
pub struct SourceResolver {
    catalog: Arc<dyn CatalogService>,
    audio: Arc<dyn AudioResolver>,
    ttl: Duration,
    memo: DashMap<String, (SourceMatch, Instant)>,
}

impl SourceResolver {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        audio: Arc<dyn AudioResolver>,
        ttl: Duration,
    ) -> Self {
        Self {
            catalog,
            audio,
            ttl,
            memo: DashMap::new(),
        }
    }

    pub fn audio(&self) -> &Arc<dyn AudioResolver> {
        &self.audio
    }

    pub async fn resolve(&self, catalog_id: &str) -> Result<SourceMatch, FetchError> {
        if let Some(hit) = self.memoized(catalog_id) {
            debug!("Resolved {} from memo -> {}", catalog_id, hit.source_id);
            return Ok(hit);
        }

        let track = self.catalog.track(catalog_id).await?;
        let query = track.search_query();

        let source_id = match self.audio.search(&query).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!("{} found nothing for '{}'", self.audio.name(), query);
                return Err(FetchError::NoMatch { query });
            }
            Err(source) => return Err(FetchError::Resolution { query, source }),
        };

        debug!("Resolved {} ('{}') -> {}", catalog_id, query, source_id);
        let found = SourceMatch { source_id, query };
        if !self.ttl.is_zero() {
            self.remember(catalog_id, &found);
        }
        Ok(found)
    }

    /// Stores `found` and drops every entry that has outlived the TTL, so the
    /// map only holds ids resolved within the last `ttl`.
    fn remember(&self, catalog_id: &str, found: &SourceMatch) {
        self.memo.retain(|_, (_, at)| at.elapsed() < self.ttl);
        self.memo
            .insert(catalog_id.to_string(), (found.clone(), Instant::now()));
    }

    fn memoized(&self, catalog_id: &str) -> Option<SourceMatch> {
        if self.ttl.is_zero() {
            return None;
        }
        let fresh = {
            let entry = self.memo.get(catalog_id)?;
            let (found, at) = entry.value();
            (at.elapsed() < self.ttl).then(|| found.clone())
        };
        if fresh.is_none() {
            self.memo.remove(catalog_id);
        }
        fresh
    }
}
