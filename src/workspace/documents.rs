use crate::error::{ProviderError, ProviderResult};
use crate::host::{DocumentSnapshot, DocumentStore};
use crate::model::FileId;
use async_trait::async_trait;
use blake3::Hasher;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
struct Tracked {
    hash: blake3::Hash,
    version: i64,
}

/// Documents read from disk. A file's version starts at 1 and increases each
/// time its content hash changes between reads.
pub struct FsDocuments {
    root: PathBuf,
    tracked: Mutex<HashMap<FileId, Tracked>>,
}

impl FsDocuments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tracked: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn abs_path(&self, file: &FileId) -> PathBuf {
        self.root.join(file.path())
    }

    fn observe(&self, file: &FileId, text: &str) -> i64 {
        let mut hasher = Hasher::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();
        let mut tracked = self.tracked.lock();
        match tracked.get_mut(file) {
            Some(entry) if entry.hash == hash => entry.version,
            Some(entry) => {
                entry.hash = hash;
                entry.version += 1;
                entry.version
            }
            None => {
                tracked.insert(file.clone(), Tracked { hash, version: 1 });
                1
            }
        }
    }
}

#[async_trait]
impl DocumentStore for FsDocuments {
    async fn open(&self, file: &FileId) -> ProviderResult<DocumentSnapshot> {
        let path = self.abs_path(file);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| ProviderError::io(file.as_str(), err))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let version = self.observe(file, &text);
        Ok(DocumentSnapshot { text, version })
    }
}
