use crate::cache::CallCache;
use crate::model::{
    FileId, ForwardAnalysis, InternalCallNode, Location, MethodDefinitionRecord, Symbol,
    enclosing_method,
};
use crate::text::{LineIndex, Position, Range};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Identity of a method on the current descent path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PathKey {
    Definition(FileId, Position),
    Name(String),
}

struct Document {
    text: String,
    lines: LineIndex,
}

/// State of one analysis: the descent path and the documents read so far.
struct Run {
    max_depth: usize,
    path: HashSet<PathKey>,
    documents: HashMap<FileId, Arc<Document>>,
}

impl Run {
    async fn document(&mut self, cache: &CallCache, file: &FileId) -> Result<Arc<Document>> {
        if let Some(doc) = self.documents.get(file) {
            return Ok(doc.clone());
        }
        let snapshot = cache
            .host()
            .documents
            .open(file)
            .await
            .with_context(|| format!("open {file}"))?;
        let doc = Arc::new(Document {
            lines: LineIndex::new(&snapshot.text),
            text: snapshot.text,
        });
        self.documents.insert(file.clone(), doc.clone());
        Ok(doc)
    }
}

/// Builds "what does this call" forests.
pub struct ForwardAnalyzer {
    cache: Arc<CallCache>,
}

impl ForwardAnalyzer {
    pub fn new(cache: Arc<CallCache>) -> Self {
        Self { cache }
    }

    pub async fn analyze(
        &self,
        root: &Symbol,
        file: &FileId,
        max_depth: usize,
    ) -> Result<ForwardAnalysis> {
        let mut run = Run {
            max_depth,
            path: HashSet::from([PathKey::Definition(file.clone(), root.range.start)]),
            documents: HashMap::new(),
        };
        let calls = self
            .calls_in(&mut run, file, root.range, root.selection_range, 0)
            .await?;
        Ok(ForwardAnalysis {
            root_method: root.method_name().to_string(),
            root_location: Location::new(file.clone(), root.selection_range),
            total_calls_found: calls.iter().map(InternalCallNode::count).sum(),
            calls,
            analysis_depth: max_depth,
        })
    }

    /// Calls made inside `span` of `file`, at `depth`, expanded recursively.
    fn calls_in<'a>(
        &'a self,
        run: &'a mut Run,
        file: &'a FileId,
        span: Range,
        name_token: Range,
        depth: usize,
    ) -> BoxFuture<'a, Result<Vec<InternalCallNode>>> {
        Box::pin(async move {
            let doc = run.document(&self.cache, file).await?;
            let (start, end) = doc.lines.byte_span(&doc.text, &span);
            let candidates = self.cache.extractor_for(file).extract(&doc.text[start..end]);

            let mut seen: HashSet<(String, Position)> = HashSet::new();
            let mut nodes = Vec::new();
            for candidate in candidates {
                let offset = start + candidate.offset;
                let occurrence = doc
                    .lines
                    .range(&doc.text, offset, offset + candidate.name.len());
                // The method's own name in its signature.
                if name_token.intersects(&occurrence) {
                    continue;
                }
                if !seen.insert((candidate.name.clone(), occurrence.start)) {
                    continue;
                }

                let definition = self.resolve(file, &candidate.name, occurrence.start).await;
                let key = match &definition {
                    Some(def) => PathKey::Definition(def.file_id.clone(), def.symbol.range.start),
                    None => PathKey::Name(candidate.name.clone()),
                };
                let is_recursive = run.path.contains(&key);
                let mut node = InternalCallNode {
                    method_name: candidate.name,
                    file_id: file.clone(),
                    occurrence_range: occurrence,
                    definition_location: definition
                        .as_ref()
                        .map(|def| Location::new(def.file_id.clone(), def.symbol.selection_range)),
                    depth,
                    children: Vec::new(),
                    is_resolved: definition.is_some(),
                    is_recursive,
                };

                if let Some(def) = definition.as_ref() {
                    if !is_recursive && depth < run.max_depth {
                        run.path.insert(key.clone());
                        let children = self
                            .calls_in(
                                run,
                                &def.file_id,
                                def.symbol.range,
                                def.symbol.selection_range,
                                depth + 1,
                            )
                            .await;
                        run.path.remove(&key);
                        node.children = children?;
                    }
                }
                nodes.push(node);
            }
            Ok(nodes)
        })
    }

    /// Cached definitions first, then the host's definition service.
    async fn resolve(
        &self,
        file: &FileId,
        name: &str,
        position: Position,
    ) -> Option<MethodDefinitionRecord> {
        if let Some(def) = self.cache.resolve_definition(name, Some(file)) {
            return Some(def);
        }
        let provider = self.cache.host().definitions.as_ref()?;
        let location = match provider.definition(file, position).await {
            Ok(Some(location)) => location,
            Ok(None) => return None,
            Err(err) => {
                debug!(method = name, file = %file, "definition provider failed: {err}");
                return None;
            }
        };
        let symbols = self.cache.get_symbols(&location.file_id, false).await;
        enclosing_method(&symbols, location.range.start).map(|symbol| MethodDefinitionRecord {
            method_name: symbol.method_name().to_string(),
            file_id: location.file_id.clone(),
            symbol: symbol.shallow(),
            file_path: location.file_id.path().to_path_buf(),
        })
    }
}
