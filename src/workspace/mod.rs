//! Host implementation backed by the local filesystem.

use crate::error::{ProviderError, ProviderResult};
use crate::host::{FileEnumerator, Host};
use crate::model::FileId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod documents;
pub mod outline;
pub mod scan;

pub use documents::FsDocuments;
pub use outline::OutlineProvider;

/// Enumerates source files under a workspace root.
pub struct WorkspaceFiles {
    root: PathBuf,
}

impl WorkspaceFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileEnumerator for WorkspaceFiles {
    async fn find_files(&self, include: &[String], exclude: &[String]) -> ProviderResult<Vec<FileId>> {
        let root = self.root.clone();
        let include = include.to_vec();
        let exclude = exclude.to_vec();
        let files = tokio::task::spawn_blocking(move || {
            let paths = scan::scan_files(&root, &include, &exclude)?;
            paths
                .iter()
                .map(|path| crate::util::normalize_rel_path(&root, path).map(FileId::new))
                .collect::<anyhow::Result<Vec<_>>>()
        })
        .await
        .map_err(|err| ProviderError::Unavailable(format!("file scan task: {err}")))?
        .map_err(|err| ProviderError::Unavailable(format!("{err:#}")))?;
        Ok(files)
    }
}

/// Host over `root`: disk documents, tree-sitter outlines, gitignore-aware
/// enumeration. No reference or definition service is attached.
pub fn filesystem_host(root: &Path) -> Host {
    let documents = Arc::new(FsDocuments::new(root));
    let symbols = Arc::new(OutlineProvider::new(documents.clone()));
    let files = Arc::new(WorkspaceFiles::new(root));
    Host::new(symbols, documents, files)
}
