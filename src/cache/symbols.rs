use crate::cache::resolve;
use crate::model::{FileId, FileSymbolEntry, MethodDefinitionRecord, callable_symbols};
use std::collections::HashMap;

/// Per-file outlines plus the derived method name -> definitions mapping.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    files: HashMap<FileId, FileSymbolEntry>,
    definitions: HashMap<String, Vec<MethodDefinitionRecord>>,
}

impl SymbolIndex {
    /// Store `entry`, replacing the file's previous outline and definitions.
    pub fn insert(&mut self, entry: FileSymbolEntry) {
        self.remove(&entry.file_id);
        for symbol in callable_symbols(&entry.symbols) {
            let name = symbol.method_name().to_string();
            if name.is_empty() {
                continue;
            }
            self.definitions
                .entry(name.clone())
                .or_default()
                .push(MethodDefinitionRecord {
                    method_name: name,
                    file_id: entry.file_id.clone(),
                    symbol: symbol.shallow(),
                    file_path: entry.file_id.path().to_path_buf(),
                });
        }
        self.files.insert(entry.file_id.clone(), entry);
    }

    /// Drop a file's outline and every definition it contributed.
    pub fn remove(&mut self, file: &FileId) -> bool {
        let Some(old) = self.files.remove(file) else {
            return false;
        };
        for symbol in callable_symbols(&old.symbols) {
            let name = symbol.method_name();
            if let Some(records) = self.definitions.get_mut(name) {
                records.retain(|record| &record.file_id != file);
                if records.is_empty() {
                    self.definitions.remove(name);
                }
            }
        }
        true
    }

    pub fn entry(&self, file: &FileId) -> Option<&FileSymbolEntry> {
        self.files.get(file)
    }

    pub fn contains(&self, file: &FileId) -> bool {
        self.files.contains_key(file)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileId> {
        self.files.keys()
    }

    pub fn find_definitions(&self, name: &str) -> &[MethodDefinitionRecord] {
        self.definitions
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn resolve_definition(
        &self,
        name: &str,
        context: Option<&FileId>,
    ) -> Option<&MethodDefinitionRecord> {
        resolve::pick(self.find_definitions(name), context)
    }

    pub fn clear(&mut self) {
        self.files.clear();
        self.definitions.clear();
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.values().map(Vec::len).sum()
    }

    pub fn unique_names(&self) -> usize {
        self.definitions.len()
    }
}
