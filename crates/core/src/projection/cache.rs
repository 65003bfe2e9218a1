//! Projection result caching using Moka.
//!
//! Results are keyed by scenario, scenario revision, and options, so any
//! stored mutation (which bumps the revision) naturally misses the cache.

use std::sync::Arc;
use std::time::Duration;

use cimiento_shared::types::ScenarioProjectId;
use moka::sync::Cache;
use rayon::prelude::*;

use super::engine::{ProjectionEngine, ProjectionInput, ProjectionOptions, ProjectionResult};
use super::error::ProjectionError;

/// Default cache capacity (number of entries).
const DEFAULT_CACHE_CAPACITY: u64 = 100;

/// Default time-to-live for cache entries (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// Cache key for a projection result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Scenario project.
    pub project_id: ScenarioProjectId,
    /// Scenario revision the result was computed from.
    pub revision: i64,
    /// Hash of the engine options.
    pub options_hash: u64,
}

/// Thread-safe cache of projection results.
#[derive(Clone)]
pub struct ProjectionCache {
    cache: Cache<CacheKey, Arc<ProjectionResult>>,
}

impl ProjectionCache {
    /// Creates a cache with default settings: 100 entries, 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom capacity and TTL.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .support_invalidation_closures()
            .build();

        Self { cache }
    }

    /// Runs a projection, returning the cached result when available.
    ///
    /// Cached results come back with `cached: true`. Errors are not cached.
    pub fn run_cached(
        &self,
        input: &ProjectionInput,
        options: &ProjectionOptions,
        revision: i64,
    ) -> Result<ProjectionResult, ProjectionError> {
        let key = CacheKey {
            project_id: input.project_id,
            revision,
            options_hash: ProjectionEngine::hash_options(options),
        };

        if let Some(hit) = self.cache.get(&key) {
            let mut result = (*hit).clone();
            result.cached = true;
            return Ok(result);
        }

        let result = ProjectionEngine::run(input, options)?;
        self.cache.insert(key, Arc::new(result.clone()));
        Ok(result)
    }

    /// Runs several projections in parallel through the cache.
    pub fn run_many_cached(
        &self,
        inputs: &[(ProjectionInput, i64)],
        options: &ProjectionOptions,
    ) -> Vec<Result<ProjectionResult, ProjectionError>> {
        inputs
            .par_iter()
            .map(|(input, revision)| self.run_cached(input, options, *revision))
            .collect()
    }

    /// Drops every cached result of one scenario.
    pub fn invalidate_project(&self, project_id: ScenarioProjectId) -> bool {
        self.cache
            .invalidate_entries_if(move |key, _| key.project_id == project_id)
            .is_ok()
    }

    /// Invalidates all cached entries.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of entries currently in the cache.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance so counts and evictions are up to date.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new()
    }
}
