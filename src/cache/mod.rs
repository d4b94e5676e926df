//! In-memory symbol and reference caches.
//!
//! Fetching (provider calls, scanning) is split from applying (index
//! mutation) so a batch can fetch concurrently and still apply in file order.

use crate::error::{ProviderError, ProviderResult};
use crate::extract::{CallExtractor, ExtractorSet};
use crate::host::Host;
use crate::model::{
    CacheStatistics, FileId, FileSymbolEntry, MethodDefinitionRecord, MethodReferenceRecord,
    Symbol,
};
use parking_lot::RwLock;
use tracing::debug;

pub mod references;
pub mod resolve;
pub mod symbols;

pub use references::ReferenceIndex;
pub use symbols::SymbolIndex;

/// Everything learned about one file, not yet visible to readers.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub file_id: FileId,
    pub symbols: Vec<Symbol>,
    pub version: i64,
    pub references: Vec<MethodReferenceRecord>,
}

pub struct CallCache {
    host: Host,
    extractors: ExtractorSet,
    symbols: RwLock<SymbolIndex>,
    references: RwLock<ReferenceIndex>,
}

impl CallCache {
    pub fn new(host: Host, extractors: ExtractorSet) -> Self {
        Self {
            host,
            extractors,
            symbols: RwLock::new(SymbolIndex::default()),
            references: RwLock::new(ReferenceIndex::default()),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn extractor_for(&self, file: &FileId) -> &dyn CallExtractor {
        self.extractors.for_file(file)
    }

    /// Outline, version and call sites of `file`. An empty outline is an
    /// error: the file stays unindexed rather than cached as empty.
    ///
    /// The snapshot is taken before outlining, so an edit landing in between
    /// leaves the entry at the older version and the next lookup refreshes it.
    pub async fn fetch(&self, file: &FileId) -> ProviderResult<FetchedFile> {
        let document = self.host.documents.open(file).await?;
        let symbols = self.host.symbols.document_symbols(file).await?;
        if symbols.is_empty() {
            return Err(ProviderError::Unavailable(format!("no symbols for {file}")));
        }
        let references =
            references::scan_references(file, &document.text, self.extractor_for(file));
        Ok(FetchedFile {
            file_id: file.clone(),
            symbols,
            version: document.version,
            references,
        })
    }

    pub fn apply(&self, fetched: FetchedFile) {
        let FetchedFile {
            file_id,
            symbols,
            version,
            references,
        } = fetched;
        self.references.write().replace_file(&file_id, references);
        self.symbols.write().insert(FileSymbolEntry {
            file_id,
            symbols,
            version,
            indexed_at: crate::util::unix_millis(),
        });
    }

    /// Fetch and apply one file. On failure the file is dropped from both
    /// indices and `false` is returned.
    pub async fn index_file(&self, file: &FileId) -> bool {
        match self.fetch(file).await {
            Ok(fetched) => {
                self.apply(fetched);
                true
            }
            Err(err) => {
                debug!(file = %file, "not indexed: {err}");
                self.invalidate(file);
                false
            }
        }
    }

    /// Cached outline of `file`, rebuilt when the document version moved on
    /// or `force_refresh` is set. Empty when the file cannot be outlined.
    pub async fn get_symbols(&self, file: &FileId, force_refresh: bool) -> Vec<Symbol> {
        if !force_refresh {
            let cached = {
                let index = self.symbols.read();
                index
                    .entry(file)
                    .map(|entry| (entry.version, entry.symbols.clone()))
            };
            if let Some((version, symbols)) = cached {
                match self.host.documents.version(file).await {
                    Ok(current) if current == version => return symbols,
                    Ok(current) => debug!(file = %file, cached = version, current, "stale outline"),
                    Err(err) => {
                        debug!(file = %file, "version check failed, serving cached outline: {err}");
                        return symbols;
                    }
                }
            }
        }
        if !self.index_file(file).await {
            return Vec::new();
        }
        self.symbols
            .read()
            .entry(file)
            .map(|entry| entry.symbols.clone())
            .unwrap_or_default()
    }

    pub fn invalidate(&self, file: &FileId) {
        self.symbols.write().remove(file);
        self.references.write().remove_file(file);
    }

    pub fn clear(&self) {
        self.symbols.write().clear();
        self.references.write().clear();
    }

    pub fn is_indexed(&self, file: &FileId) -> bool {
        self.symbols.read().contains(file)
    }

    pub fn indexed_files(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = self.symbols.read().files().cloned().collect();
        files.sort();
        files
    }

    pub fn find_definitions(&self, name: &str) -> Vec<MethodDefinitionRecord> {
        self.symbols.read().find_definitions(name).to_vec()
    }

    pub fn find_references(&self, name: &str) -> Vec<MethodReferenceRecord> {
        self.references.read().find_references(name).to_vec()
    }

    pub fn resolve_definition(
        &self,
        name: &str,
        context: Option<&FileId>,
    ) -> Option<MethodDefinitionRecord> {
        self.symbols.read().resolve_definition(name, context).cloned()
    }

    pub fn statistics(&self) -> CacheStatistics {
        let symbols = self.symbols.read();
        let references = self.references.read();
        CacheStatistics {
            total_files: symbols.file_count(),
            total_method_definitions: symbols.definition_count(),
            unique_method_names: symbols.unique_names(),
            total_references: references.reference_count(),
            unique_referenced_methods: references.unique_names(),
            indexing_in_progress: false,
        }
    }
}
