//! Condition parsing cache
//!
//! Trees are immutable, so a parsed condition can be shared across every
//! group that carries the same condition string. Caching is opt-in: `parse`
//! never consults it.
//!
//! A cache holds at most `capacity` conditions. Inserting past the limit
//! drops every cached entry first, so a long-running host that processes
//! many projects keeps a bounded working set.

use crate::condition::evaluator::{ConditionEvaluationState, ConditionExpression};
use crate::condition::parser::{self, ParseError};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Conditions held by a cache created with `new`
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Cache of parsed conditions keyed by their source text
#[derive(Debug)]
pub struct ConditionCache {
    entries: RwLock<AHashMap<String, Arc<ConditionExpression>>>,
    capacity: usize,
}

impl Default for ConditionCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl ConditionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` conditions
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get or parse a condition string
    pub fn get_or_parse(&self, condition: &str) -> Result<Arc<ConditionExpression>, ParseError> {
        // Fast path: check read lock first
        {
            let entries = self.entries.read();
            if let Some(expr) = entries.get(condition) {
                return Ok(Arc::clone(expr));
            }
        }

        let expr = Arc::new(parser::parse(condition)?);
        debug!(condition, "Parsed condition");

        let mut entries = self.entries.write();
        if entries.len() >= self.capacity && !entries.contains_key(condition) {
            debug!(evicted = entries.len(), "Condition cache full, clearing");
            entries.clear();
        }
        let cached = entries
            .entry(condition.to_string())
            .or_insert_with(|| Arc::clone(&expr));
        Ok(Arc::clone(cached))
    }

    /// Evaluate a condition; an empty condition always applies
    ///
    /// Returns `Ok(None)` when the condition cannot be evaluated against
    /// `state`.
    pub fn check(
        &self,
        condition: &str,
        state: &dyn ConditionEvaluationState,
    ) -> Result<Option<bool>, ParseError> {
        if condition.trim().is_empty() {
            return Ok(Some(true));
        }

        let expr = self.get_or_parse(condition)?;
        Ok(expr.evaluate(state))
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Process-wide condition cache
static CONDITION_CACHE: Lazy<ConditionCache> = Lazy::new(ConditionCache::new);

/// Get or parse a condition string using the shared cache
#[inline]
pub fn get_or_parse(condition: &str) -> Result<Arc<ConditionExpression>, ParseError> {
    CONDITION_CACHE.get_or_parse(condition)
}

/// Check a condition against a state using the shared cache
#[inline]
pub fn check_condition(
    condition: &str,
    state: &dyn ConditionEvaluationState,
) -> Result<Option<bool>, ParseError> {
    CONDITION_CACHE.check(condition, state)
}

/// Clear the shared cache
pub fn clear_cache() {
    CONDITION_CACHE.clear();
}

/// Number of conditions held by the shared cache
pub fn cache_size() -> usize {
    CONDITION_CACHE.len()
}
