//! In-memory cache of compiled plans.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use super::hash::compute_hash;
use super::plan::QueryPlan;
use super::request::SliceRequest;
use super::{PlanError, PlanResult};
use crate::model::{Join, TableRef};

#[derive(Serialize)]
struct CacheKey<'a> {
    main_table: &'a TableRef,
    joins: &'a [Join],
    request: &'a SliceRequest,
}

/// Compiled plans keyed by a hash of their inputs.
///
/// Holds at most `capacity` plans; inserting into a full cache evicts an
/// arbitrary entry. A capacity of zero disables caching.
#[derive(Debug)]
pub struct PlanCache {
    plans: DashMap<String, Arc<QueryPlan>>,
    capacity: usize,
}

impl Default for PlanCache {
    fn default() -> Self {
        Self::new(crate::config::PlannerSettings::default().plan_cache_capacity)
    }
}

impl PlanCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            plans: DashMap::new(),
            capacity,
        }
    }

    /// Cache key for compiling `request` against a main table and joins.
    pub fn key(main_table: &TableRef, joins: &[Join], request: &SliceRequest) -> PlanResult<String> {
        compute_hash(&CacheKey {
            main_table,
            joins,
            request,
        })
        .map_err(|e| PlanError::Fingerprint(e.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<Arc<QueryPlan>> {
        self.plans.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Return the cached plan for `key`, or compile, cache and return one.
    ///
    /// Errors from `compile` are returned and never cached.
    pub fn get_or_compile<F>(&self, key: String, compile: F) -> PlanResult<Arc<QueryPlan>>
    where
        F: FnOnce() -> PlanResult<QueryPlan>,
    {
        if let Some(plan) = self.get(&key) {
            debug!(key = %key, "plan cache hit");
            return Ok(plan);
        }

        let plan = Arc::new(compile()?);
        if self.capacity == 0 {
            return Ok(plan);
        }
        if self.plans.len() >= self.capacity {
            let victim = self.plans.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.plans.remove(&victim);
            }
        }
        self.plans.insert(key, Arc::clone(&plan));
        Ok(plan)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn clear(&self) {
        self.plans.clear();
    }
}
