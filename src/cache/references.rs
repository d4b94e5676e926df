use crate::extract::CallExtractor;
use crate::model::{FileId, MethodReferenceRecord};
use crate::text::LineIndex;
use std::collections::{HashMap, HashSet};

/// Method name -> lexical call sites, maintained per file.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    references: HashMap<String, Vec<MethodReferenceRecord>>,
    names_by_file: HashMap<FileId, HashSet<String>>,
}

impl ReferenceIndex {
    pub fn replace_file(&mut self, file: &FileId, records: Vec<MethodReferenceRecord>) {
        self.remove_file(file);
        let mut names = HashSet::new();
        for record in records {
            names.insert(record.method_name.clone());
            self.references
                .entry(record.method_name.clone())
                .or_default()
                .push(record);
        }
        self.names_by_file.insert(file.clone(), names);
    }

    pub fn remove_file(&mut self, file: &FileId) -> bool {
        let Some(names) = self.names_by_file.remove(file) else {
            return false;
        };
        for name in names {
            if let Some(records) = self.references.get_mut(&name) {
                records.retain(|record| &record.file_id != file);
                if records.is_empty() {
                    self.references.remove(&name);
                }
            }
        }
        true
    }

    pub fn find_references(&self, name: &str) -> &[MethodReferenceRecord] {
        self.references
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.references.clear();
        self.names_by_file.clear();
    }

    pub fn reference_count(&self) -> usize {
        self.references.values().map(Vec::len).sum()
    }

    pub fn unique_names(&self) -> usize {
        self.references.len()
    }
}

/// Every call-like occurrence in `text`, as reference records of `file`.
pub fn scan_references(
    file: &FileId,
    text: &str,
    extractor: &dyn CallExtractor,
) -> Vec<MethodReferenceRecord> {
    let lines = LineIndex::new(text);
    extractor
        .extract(text)
        .into_iter()
        .map(|candidate| MethodReferenceRecord {
            range: lines.range(text, candidate.offset, candidate.offset + candidate.name.len()),
            method_name: candidate.name,
            file_id: file.clone(),
            file_path: file.path().to_path_buf(),
        })
        .collect()
}
