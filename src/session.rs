//! Entry point that owns the caches and indexing state for one workspace.

use crate::analysis::Analyzer;
use crate::cache::CallCache;
use crate::config::Config;
use crate::extract::ExtractorSet;
use crate::host::Host;
use crate::indexer::{Indexer, IndexerOptions};
use crate::model::{
    CacheStatistics, CallNode, FileId, ForwardAnalysis, IndexingReport, Symbol, callable_symbols,
};
use std::sync::Arc;
use tracing::debug;

pub struct Session {
    config: Config,
    cache: Arc<CallCache>,
    indexer: Indexer,
    analyzer: Analyzer,
}

impl Session {
    pub fn new(host: Host, config: Config) -> Self {
        let extractors = ExtractorSet::from_denylist(&config.denylist());
        Self::with_extractors(host, config, extractors)
    }

    pub fn with_extractors(host: Host, config: Config, extractors: ExtractorSet) -> Self {
        let cache = Arc::new(CallCache::new(host, extractors));
        let indexer = Indexer::new(cache.clone(), IndexerOptions::from_config(&config));
        let analyzer = Analyzer::new(cache.clone());
        Self {
            config,
            cache,
            indexer,
            analyzer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CallCache> {
        &self.cache
    }

    pub async fn ensure_indexed(&self) -> IndexingReport {
        self.indexer.ensure_indexed().await
    }

    pub async fn reindex_all(&self) -> IndexingReport {
        self.indexer.reindex_all().await
    }

    pub async fn force_reindex_all(&self) -> IndexingReport {
        self.indexer.force_reindex_all().await
    }

    /// Who calls `root`, up to `max_depth` levels (clamped to 1..=10).
    pub async fn analyze_backward(
        &self,
        root: &Symbol,
        file: &FileId,
        max_depth: usize,
    ) -> Option<CallNode> {
        self.ensure_indexed().await;
        self.analyzer.analyze_backward(root, file, max_depth).await
    }

    /// What `root` calls, up to `max_depth` levels (clamped to 1..=10).
    pub async fn analyze_forward(
        &self,
        root: &Symbol,
        file: &FileId,
        max_depth: usize,
    ) -> Option<ForwardAnalysis> {
        self.ensure_indexed().await;
        self.analyzer.analyze_forward(root, file, max_depth).await
    }

    pub fn cache_statistics(&self) -> CacheStatistics {
        CacheStatistics {
            indexing_in_progress: self.indexer.in_progress(),
            ..self.cache.statistics()
        }
    }

    pub fn invalidate_file(&self, file: &FileId) {
        debug!(file = %file, "invalidate");
        self.cache.invalidate(file);
    }

    /// Re-read one file into both indices. False when it could not be indexed.
    pub async fn update_file(&self, file: &FileId) -> bool {
        self.cache.index_file(file).await
    }

    /// Current outline of `file`.
    pub async fn symbols(&self, file: &FileId) -> Vec<Symbol> {
        self.cache.get_symbols(file, false).await
    }

    /// Callable symbol of `file` named `name`. With `line` (0-based), the
    /// one whose range covers that line.
    pub async fn find_method(&self, file: &FileId, name: &str, line: Option<u32>) -> Option<Symbol> {
        let symbols = self.symbols(file).await;
        callable_symbols(&symbols)
            .into_iter()
            .filter(|symbol| symbol.method_name() == name)
            .find(|symbol| match line {
                Some(line) => symbol.range.start.line <= line && line <= symbol.range.end.line,
                None => true,
            })
            .cloned()
    }

    /// Drop all cached state. The session can be indexed again afterwards.
    pub async fn teardown(&self) {
        self.indexer.reset().await;
        self.cache.clear();
    }
}
