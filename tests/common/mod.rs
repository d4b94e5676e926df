#![allow(dead_code)]

use async_trait::async_trait;
use calltrace::error::{ProviderError, ProviderResult};
use calltrace::host::{
    DefinitionProvider, DocumentSnapshot, DocumentStore, FileEnumerator, Host, ProgressSink,
    ReferenceProvider, SymbolProvider,
};
use calltrace::model::{FileId, Location, Symbol};
use calltrace::text::Position;
use calltrace::workspace::outline::outline_source;
use calltrace::workspace::scan::language_for_path;
use calltrace::{Config, Session};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory workspace serving documents, tree-sitter outlines and file
/// enumeration.
#[derive(Default)]
pub struct MemoryWorkspace {
    files: Mutex<BTreeMap<FileId, (String, i64)>>,
    broken: Mutex<HashSet<FileId>>,
    warmup: AtomicUsize,
    edit_after_outline: Mutex<Option<(String, String)>>,
    pub symbol_calls: AtomicUsize,
    pub enumerations: AtomicUsize,
}

impl MemoryWorkspace {
    pub fn new(files: &[(&str, &str)]) -> Arc<Self> {
        let workspace = Self::default();
        for (path, text) in files {
            workspace.set(path, text);
        }
        Arc::new(workspace)
    }

    /// Write `text`, bumping the file's version.
    pub fn set(&self, path: &str, text: &str) {
        let mut files = self.files.lock();
        let version = files.get(&FileId::new(path)).map(|(_, v)| v + 1).unwrap_or(1);
        files.insert(FileId::new(path), (text.to_string(), version));
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().remove(&FileId::new(path));
    }

    /// Make `open` fail for `path` from now on.
    pub fn break_document(&self, path: &str) {
        self.broken.lock().insert(FileId::new(path));
    }

    /// Write `text` to `path` right after the next outline is computed.
    pub fn edit_after_next_outline(&self, path: &str, text: &str) {
        *self.edit_after_outline.lock() = Some((path.to_string(), text.to_string()));
    }

    /// Return empty outlines for the first `calls` symbol requests.
    pub fn set_warmup(&self, calls: usize) {
        self.warmup.store(calls, Ordering::SeqCst);
    }
}

#[async_trait]
impl SymbolProvider for MemoryWorkspace {
    async fn document_symbols(&self, file: &FileId) -> ProviderResult<Vec<Symbol>> {
        let call = self.symbol_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.warmup.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        let text = match self.files.lock().get(file) {
            Some((text, _)) => text.clone(),
            None => return Err(ProviderError::NotFound(file.to_string())),
        };
        let language = language_for_path(file.path())
            .ok_or_else(|| ProviderError::Unavailable(format!("no language for {file}")))?;
        let outline = outline_source(language, &text).map_err(|message| ProviderError::Parse {
            path: file.to_string(),
            message,
        });
        let edit = self.edit_after_outline.lock().take();
        if let Some((path, text)) = edit {
            self.set(&path, &text);
        }
        outline
    }
}

#[async_trait]
impl DocumentStore for MemoryWorkspace {
    async fn open(&self, file: &FileId) -> ProviderResult<DocumentSnapshot> {
        if self.broken.lock().contains(file) {
            return Err(ProviderError::Unavailable(format!("{file} is broken")));
        }
        match self.files.lock().get(file) {
            Some((text, version)) => Ok(DocumentSnapshot {
                text: text.clone(),
                version: *version,
            }),
            None => Err(ProviderError::NotFound(file.to_string())),
        }
    }
}

#[async_trait]
impl FileEnumerator for MemoryWorkspace {
    async fn find_files(&self, _include: &[String], _exclude: &[String]) -> ProviderResult<Vec<FileId>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.lock().keys().cloned().collect())
    }
}

/// Reference service answering from a fixed table keyed by method name token.
#[derive(Default)]
pub struct FixedReferences {
    pub table: HashMap<(FileId, Position), Vec<Location>>,
}

#[async_trait]
impl ReferenceProvider for FixedReferences {
    async fn references(&self, file: &FileId, position: Position) -> ProviderResult<Vec<Location>> {
        Ok(self
            .table
            .get(&(file.clone(), position))
            .cloned()
            .unwrap_or_default())
    }
}

pub struct PanickingReferences;

#[async_trait]
impl ReferenceProvider for PanickingReferences {
    async fn references(&self, _file: &FileId, _position: Position) -> ProviderResult<Vec<Location>> {
        panic!("reference service crashed");
    }
}

/// Definition service that maps every lookup in `from` to `target`.
pub struct FixedDefinition {
    pub from: FileId,
    pub target: Location,
}

#[async_trait]
impl DefinitionProvider for FixedDefinition {
    async fn definition(&self, file: &FileId, _position: Position) -> ProviderResult<Option<Location>> {
        if file == &self.from {
            Ok(Some(self.target.clone()))
        } else {
            Ok(None)
        }
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    pub updates: Mutex<Vec<(usize, usize)>>,
    pub summaries: Mutex<Vec<(String, bool)>>,
}

impl ProgressSink for RecordingProgress {
    fn progress(&self, done: usize, total: usize, _message: &str) {
        self.updates.lock().push((done, total));
    }

    fn summary(&self, message: &str, warning: bool) {
        self.summaries.lock().push((message.to_string(), warning));
    }
}

pub fn host(workspace: &Arc<MemoryWorkspace>) -> Host {
    Host::new(workspace.clone(), workspace.clone(), workspace.clone())
}

/// Config for tests: no pauses, a single readiness poll.
pub fn fast_config() -> Config {
    Config {
        batch_pause_ms: 0,
        ready_retries: 1,
        ready_delay_ms: 0,
        ..Config::default()
    }
}

pub fn session(workspace: &Arc<MemoryWorkspace>) -> Session {
    Session::new(host(workspace), fast_config())
}

pub async fn method(session: &Session, path: &str, name: &str) -> Symbol {
    session
        .find_method(&FileId::new(path), name, None)
        .await
        .unwrap_or_else(|| panic!("{name} not found in {path}"))
}

pub const DOOR_PY: &str = "\
def open():
    return 1


def openNow():
    return open()


def quickStart():
    openNow()
";
