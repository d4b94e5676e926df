use crate::text::{Position, Range};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a workspace file: its normalized, `/`-separated path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(crate::util::normalize_path(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.0)
    }

    pub fn extension(&self) -> Option<&str> {
        self.path().extension().and_then(|ext| ext.to_str())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    File,
    Module,
    Namespace,
    Class,
    Struct,
    Enum,
    Interface,
    Method,
    Function,
    Constructor,
    Property,
    Field,
    Variable,
    Constant,
    Other,
}

impl SymbolKind {
    /// Kinds that contribute to the name -> definition mapping.
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            SymbolKind::Method | SymbolKind::Function | SymbolKind::Constructor
        )
    }
}

/// A node of a file outline. Children lie inside the parent's `range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub range: Range,
    pub selection_range: Range,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Symbol>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, range: Range, selection_range: Range) -> Self {
        Self {
            name: name.into(),
            kind,
            range,
            selection_range,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Symbol>) -> Self {
        self.children = children;
        self
    }

    /// Copy of this symbol without its subtree.
    pub fn shallow(&self) -> Symbol {
        Symbol {
            name: self.name.clone(),
            kind: self.kind,
            range: self.range,
            selection_range: self.selection_range,
            children: Vec::new(),
        }
    }

    /// Name used as the lookup key. Some outlines decorate method names with
    /// their parameter list (`open(int)`), which is dropped here.
    pub fn method_name(&self) -> &str {
        method_key(&self.name)
    }
}

pub fn method_key(name: &str) -> &str {
    let name = name.trim();
    match name.find('(') {
        Some(idx) => name[..idx].trim_end(),
        None => name,
    }
}

/// Cached outline of one file.
#[derive(Debug, Clone)]
pub struct FileSymbolEntry {
    pub file_id: FileId,
    pub symbols: Vec<Symbol>,
    pub version: i64,
    /// Unix milliseconds at which the entry was built.
    pub indexed_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDefinitionRecord {
    pub method_name: String,
    pub file_id: FileId,
    pub symbol: Symbol,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodReferenceRecord {
    pub method_name: String,
    pub file_id: FileId,
    pub range: Range,
    pub file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file_id: FileId,
    pub range: Range,
}

impl Location {
    pub fn new(file_id: FileId, range: Range) -> Self {
        Self { file_id, range }
    }
}

/// Node of a "who calls this" tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallNode {
    pub method_name: String,
    pub file_id: FileId,
    /// Name token of the method this node stands for.
    pub range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller_method_name: Option<String>,
    pub depth: usize,
    pub children: Vec<CallNode>,
}

impl CallNode {
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(CallNode::count).sum::<usize>()
    }

    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(CallNode::max_depth)
            .max()
            .unwrap_or(self.depth)
    }
}

/// Node of a "what does this call" forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternalCallNode {
    pub method_name: String,
    pub file_id: FileId,
    pub occurrence_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition_location: Option<Location>,
    pub depth: usize,
    pub children: Vec<InternalCallNode>,
    pub is_resolved: bool,
    pub is_recursive: bool,
}

impl InternalCallNode {
    pub fn count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(InternalCallNode::count)
            .sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardAnalysis {
    pub root_method: String,
    pub root_location: Location,
    pub calls: Vec<InternalCallNode>,
    pub total_calls_found: usize,
    pub analysis_depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub total_files: usize,
    pub total_method_definitions: usize,
    pub unique_method_names: usize,
    pub total_references: usize,
    pub unique_referenced_methods: usize,
    pub indexing_in_progress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// Smallest callable symbol whose range contains `pos`.
pub fn enclosing_method(symbols: &[Symbol], pos: Position) -> Option<&Symbol> {
    let mut best: Option<&Symbol> = None;
    let mut stack: Vec<&Symbol> = symbols.iter().collect();
    while let Some(symbol) = stack.pop() {
        if !symbol.range.contains(pos) {
            continue;
        }
        if symbol.kind.is_callable() {
            let tighter = match best {
                None => true,
                Some(current) => current.range.contains_range(&symbol.range),
            };
            if tighter {
                best = Some(symbol);
            }
        }
        stack.extend(symbol.children.iter());
    }
    best
}

/// Callable symbols of a forest in outline order (parents before children).
pub fn callable_symbols(symbols: &[Symbol]) -> Vec<&Symbol> {
    fn walk<'a>(symbols: &'a [Symbol], out: &mut Vec<&'a Symbol>) {
        for symbol in symbols {
            if symbol.kind.is_callable() {
                out.push(symbol);
            }
            walk(&symbol.children, out);
        }
    }
    let mut out = Vec::new();
    walk(symbols, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(l0: u32, c0: u32, l1: u32, c1: u32) -> Range {
        Range::new(Position::new(l0, c0), Position::new(l1, c1))
    }

    #[test]
    fn method_key_strips_parameter_list() {
        assert_eq!(method_key("open(int, String)"), "open");
        assert_eq!(method_key("  close "), "close");
    }

    #[test]
    fn enclosing_method_prefers_innermost() {
        let inner = Symbol::new("inner", SymbolKind::Function, range(2, 4, 4, 5), range(2, 7, 2, 12));
        let outer = Symbol::new("outer", SymbolKind::Method, range(1, 0, 6, 1), range(1, 3, 1, 8))
            .with_children(vec![inner]);
        let class = Symbol::new("Thing", SymbolKind::Class, range(0, 0, 7, 1), range(0, 6, 0, 11))
            .with_children(vec![outer]);
        let symbols = vec![class];

        let hit = enclosing_method(&symbols, Position::new(3, 2)).unwrap();
        assert_eq!(hit.name, "inner");
        let hit = enclosing_method(&symbols, Position::new(5, 0)).unwrap();
        assert_eq!(hit.name, "outer");
        assert!(enclosing_method(&symbols, Position::new(0, 2)).is_none());
    }

    #[test]
    fn callable_symbols_skip_containers() {
        let method = Symbol::new("run", SymbolKind::Method, range(1, 0, 2, 1), range(1, 3, 1, 6));
        let field = Symbol::new("count", SymbolKind::Field, range(3, 0, 3, 9), range(3, 0, 3, 5));
        let class = Symbol::new("Runner", SymbolKind::Class, range(0, 0, 4, 1), range(0, 6, 0, 12))
            .with_children(vec![method, field]);
        let names: Vec<_> = callable_symbols(std::slice::from_ref(&class))
            .into_iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["run"]);
    }
}
