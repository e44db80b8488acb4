//! Long-term memory: schema cache, query patterns and preferences.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{PreferenceValue, QueryPattern, word_set};
use crate::database::DatabaseSchema;
use crate::error::StorageResult;
use crate::state;

/// Maximum number of query patterns retained.
pub const MAX_PATTERNS: usize = 100;

/// Default number of results from [`MemoryBank::similar_patterns`].
pub const DEFAULT_SIMILAR_LIMIT: usize = 3;

/// Schema cache, query-pattern ring and user preferences.
///
/// Persisted as one unit with the fields `schema_cache`, `query_patterns`
/// and `user_preferences`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryBank {
    schema_cache: Option<DatabaseSchema>,
    query_patterns: VecDeque<QueryPattern>,
    user_preferences: BTreeMap<String, PreferenceValue>,
}

impl MemoryBank {
    /// Create an empty bank.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Schema cache
    // ------------------------------------------------------------------

    /// Replace the cached schema as a whole.
    pub fn store_schema(&mut self, schema: DatabaseSchema) {
        info!(table_count = schema.len(), "schema_cached");
        self.schema_cache = Some(schema);
    }

    /// The cached schema, if one was stored.
    #[must_use]
    pub const fn schema(&self) -> Option<&DatabaseSchema> {
        self.schema_cache.as_ref()
    }

    // ------------------------------------------------------------------
    // Query patterns
    // ------------------------------------------------------------------

    /// Append a pattern, evicting the oldest beyond [`MAX_PATTERNS`].
    pub fn record_pattern(
        &mut self,
        natural_language: impl Into<String>,
        sql: impl Into<String>,
        succeeded: bool,
    ) {
        self.push_pattern(QueryPattern::new(natural_language, sql, succeeded));
        debug!(succeeded, patterns = self.query_patterns.len(), "pattern_recorded");
    }

    fn push_pattern(&mut self, pattern: QueryPattern) {
        self.query_patterns.push_back(pattern);
        while self.query_patterns.len() > MAX_PATTERNS {
            self.query_patterns.pop_front();
        }
    }

    /// Recorded patterns, oldest first.
    #[must_use]
    pub const fn patterns(&self) -> &VecDeque<QueryPattern> {
        &self.query_patterns
    }

    /// Successful patterns sharing words with `query`, best match first.
    ///
    /// Score is the number of distinct lowercased words in common. Patterns
    /// scoring zero are dropped and ties keep recording order.
    #[must_use]
    pub fn similar_patterns(&self, query: &str, limit: usize) -> Vec<&QueryPattern> {
        let words = word_set(query);
        let mut scored: Vec<(usize, &QueryPattern)> = self
            .query_patterns
            .iter()
            .filter(|p| p.succeeded)
            .map(|p| (p.overlap(&words), p))
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, p)| p).collect()
    }

    // ------------------------------------------------------------------
    // Preferences
    // ------------------------------------------------------------------

    /// Store a preference, replacing any previous value.
    pub fn set_preference(&mut self, key: impl Into<String>, value: impl Into<PreferenceValue>) {
        self.user_preferences.insert(key.into(), value.into());
    }

    /// Look up a preference.
    #[must_use]
    pub fn preference(&self, key: &str) -> Option<&PreferenceValue> {
        self.user_preferences.get(key)
    }

    /// Look up a preference, falling back to `default` on a miss.
    #[must_use]
    pub fn get_preference(&self, key: &str, default: PreferenceValue) -> PreferenceValue {
        self.user_preferences.get(key).cloned().unwrap_or(default)
    }

    /// All preferences in key order.
    #[must_use]
    pub const fn preferences(&self) -> &BTreeMap<String, PreferenceValue> {
        &self.user_preferences
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the whole bank to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`](crate::error::StorageError) if the file
    /// cannot be written.
    pub async fn persist(&self, destination: &Path) -> StorageResult<()> {
        state::write_json(destination, self).await?;
        info!(
            patterns = self.query_patterns.len(),
            path = %destination.display(),
            "memory_bank_saved"
        );
        Ok(())
    }

    /// Replace the whole bank with the contents of `source`.
    ///
    /// Missing fields default to empty. Files holding more than
    /// [`MAX_PATTERNS`] patterns keep the newest ones.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`](crate::error::StorageError::NotFound)
    /// when the file is absent and a JSON error when it is malformed.
    pub async fn restore(&mut self, source: &Path) -> StorageResult<()> {
        let mut loaded: Self = state::read_json(source).await?;
        while loaded.query_patterns.len() > MAX_PATTERNS {
            loaded.query_patterns.pop_front();
        }

        info!(
            has_schema = loaded.schema_cache.is_some(),
            patterns = loaded.query_patterns.len(),
            preferences = loaded.user_preferences.len(),
            path = %source.display(),
            "memory_bank_restored"
        );
        *self = loaded;
        Ok(())
    }
}
