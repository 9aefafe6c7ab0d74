use parking_lot::RwLock;
use std::sync::Arc;

use crate::catalog::Document;
use crate::index::InvertedIndex;
use crate::ranker::{rank_with_margin, ScoredResult, DEFAULT_EXACT_TITLE_MARGIN};
use crate::synonyms::SynonymTable;
use crate::tokenizer::normalize;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub exact_title_margin: f32,
    pub default_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { exact_title_margin: DEFAULT_EXACT_TITLE_MARGIN, default_limit: 20 }
    }
}

/// Query entry point: normalize, expand, rank.
///
/// The index sits behind an `Arc` that is cloned per call, so searches never
/// hold the lock while scoring and a [`swap_index`](Self::swap_index) never
/// exposes a partially built index.
pub struct RetrievalEngine {
    index: RwLock<Arc<InvertedIndex>>,
    synonyms: SynonymTable,
    config: EngineConfig,
}

impl RetrievalEngine {
    pub fn new(index: InvertedIndex, synonyms: SynonymTable) -> Self {
        Self::with_config(index, synonyms, EngineConfig::default())
    }

    pub fn with_config(index: InvertedIndex, synonyms: SynonymTable, config: EngineConfig) -> Self {
        Self { index: RwLock::new(Arc::new(index)), synonyms, config }
    }

    pub fn config(&self) -> EngineConfig { self.config }

    /// Current index snapshot.
    pub fn index(&self) -> Arc<InvertedIndex> { self.index.read().clone() }

    /// Full ranked result list. Empty or all-stopword queries return an empty list.
    pub fn search(&self, raw_query: &str) -> Vec<ScoredResult> {
        self.search_with(&self.index(), raw_query)
    }

    /// Search against a snapshot the caller already holds, so result ids can be
    /// resolved against the same index they were ranked from.
    pub fn search_with(&self, index: &InvertedIndex, raw_query: &str) -> Vec<ScoredResult> {
        let terms = normalize(raw_query);
        if terms.is_empty() {
            tracing::debug!(query = raw_query, "query has no index terms");
            return Vec::new();
        }
        let expanded = self.synonyms.expand_all(&terms);
        let results = rank_with_margin(&expanded, index, raw_query, self.config.exact_title_margin);
        tracing::debug!(query = raw_query, terms = terms.len(), expanded = expanded.len(), hits = results.len(), "search");
        results
    }

    /// Ranked list truncated to `k` results (ranks are unaffected).
    pub fn search_top(&self, raw_query: &str, k: usize) -> Vec<ScoredResult> {
        let mut results = self.search(raw_query);
        results.truncate(k);
        results
    }

    pub fn document(&self, doc_id: &str) -> Option<Arc<Document>> {
        self.index.read().document(doc_id).cloned()
    }

    /// Publish a freshly built index. In-flight searches keep the snapshot they started with.
    pub fn swap_index(&self, index: InvertedIndex) {
        let num_docs = index.num_docs();
        *self.index.write() = Arc::new(index);
        tracing::info!(num_docs, "index swapped");
    }
}
