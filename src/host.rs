//! Seams to the services the engine consumes but does not implement.
//!
//! An editor integration implements these against its language services;
//! [`crate::workspace`] implements them against the local filesystem.

use crate::error::ProviderResult;
use crate::model::{FileId, Location, Symbol};
use crate::text::Position;
use async_trait::async_trait;
use std::sync::Arc;

/// Current content of a document.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub text: String,
    /// Monotonically increasing per file; changes whenever the text does.
    pub version: i64,
}

#[async_trait]
pub trait SymbolProvider: Send + Sync {
    /// Hierarchical outline of `file`. Empty when language support is not ready.
    async fn document_symbols(&self, file: &FileId) -> ProviderResult<Vec<Symbol>>;
}

#[async_trait]
pub trait ReferenceProvider: Send + Sync {
    /// Usage sites of the symbol defined at `position`. Best effort.
    async fn references(&self, file: &FileId, position: Position) -> ProviderResult<Vec<Location>>;
}

#[async_trait]
pub trait DefinitionProvider: Send + Sync {
    /// Definition of the identifier at `position`. Best effort.
    async fn definition(&self, file: &FileId, position: Position)
    -> ProviderResult<Option<Location>>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn open(&self, file: &FileId) -> ProviderResult<DocumentSnapshot>;

    async fn version(&self, file: &FileId) -> ProviderResult<i64> {
        Ok(self.open(file).await?.version)
    }
}

#[async_trait]
pub trait FileEnumerator: Send + Sync {
    /// Files matching any `include` glob and no `exclude` glob, in a stable order.
    async fn find_files(&self, include: &[String], exclude: &[String]) -> ProviderResult<Vec<FileId>>;
}

/// Advisory progress output. Never consulted for control flow.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, done: usize, total: usize, message: &str);
    fn summary(&self, message: &str, warning: bool);
}

/// Progress sink that writes to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&self, done: usize, total: usize, message: &str) {
        tracing::info!(done, total, "{message}");
    }

    fn summary(&self, message: &str, warning: bool) {
        if warning {
            tracing::warn!("{message}");
        } else {
            tracing::info!("{message}");
        }
    }
}

/// Bundle of collaborators handed to a [`crate::session::Session`].
#[derive(Clone)]
pub struct Host {
    pub symbols: Arc<dyn SymbolProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub files: Arc<dyn FileEnumerator>,
    pub references: Option<Arc<dyn ReferenceProvider>>,
    pub definitions: Option<Arc<dyn DefinitionProvider>>,
    pub progress: Arc<dyn ProgressSink>,
}

impl Host {
    pub fn new(
        symbols: Arc<dyn SymbolProvider>,
        documents: Arc<dyn DocumentStore>,
        files: Arc<dyn FileEnumerator>,
    ) -> Self {
        Self {
            symbols,
            documents,
            files,
            references: None,
            definitions: None,
            progress: Arc::new(LogProgress),
        }
    }

    pub fn with_references(mut self, references: Arc<dyn ReferenceProvider>) -> Self {
        self.references = Some(references);
        self
    }

    pub fn with_definitions(mut self, definitions: Arc<dyn DefinitionProvider>) -> Self {
        self.definitions = Some(definitions);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }
}
