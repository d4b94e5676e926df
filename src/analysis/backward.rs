use crate::cache::CallCache;
use crate::model::{CallNode, FileId, Location, Symbol, enclosing_method};
use crate::text::{Position, Range};
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

type VisitKey = (FileId, Position, String);

/// Builds "who calls this" trees.
pub struct BackwardAnalyzer {
    cache: Arc<CallCache>,
}

impl BackwardAnalyzer {
    pub fn new(cache: Arc<CallCache>) -> Self {
        Self { cache }
    }

    pub async fn analyze(&self, root: &Symbol, file: &FileId, max_depth: usize) -> CallNode {
        let mut node = CallNode {
            method_name: root.method_name().to_string(),
            file_id: file.clone(),
            range: root.selection_range,
            caller_method_name: None,
            depth: 0,
            children: Vec::new(),
        };
        let mut visited = HashSet::new();
        self.expand(&mut node, root.range, max_depth, &mut visited).await;
        node
    }

    /// `definition` is the node's full definition range; `node.range` only
    /// covers its name.
    fn expand<'a>(
        &'a self,
        node: &'a mut CallNode,
        definition: Range,
        max_depth: usize,
        visited: &'a mut HashSet<VisitKey>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if node.depth >= max_depth {
                return;
            }
            let key = (node.file_id.clone(), node.range.start, node.method_name.clone());
            if !visited.insert(key) {
                return;
            }

            let references = self.references_to(node).await;
            let mut seen: HashSet<(String, FileId, Range)> = HashSet::new();
            let mut definitions = Vec::new();
            for (file, ranges) in group_by_file(references) {
                let symbols = self.cache.get_symbols(&file, false).await;
                if symbols.is_empty() {
                    continue;
                }
                for range in ranges {
                    // Recursive calls inside the method itself are not callers.
                    if file == node.file_id && range.intersects(&definition) {
                        continue;
                    }
                    let Some(caller) = enclosing_method(&symbols, range.start) else {
                        continue;
                    };
                    // A reference on the caller's own name token is a
                    // declaration, not a call.
                    if caller.selection_range.contains_range(&range) {
                        continue;
                    }
                    let caller_name = caller.method_name().to_string();
                    if !seen.insert((caller_name.clone(), file.clone(), caller.selection_range)) {
                        continue;
                    }
                    node.children.push(CallNode {
                        method_name: caller_name,
                        file_id: file.clone(),
                        range: caller.selection_range,
                        caller_method_name: Some(node.method_name.clone()),
                        depth: node.depth + 1,
                        children: Vec::new(),
                    });
                    definitions.push(caller.range);
                }
            }

            for (child, definition) in node.children.iter_mut().zip(definitions) {
                self.expand(child, definition, max_depth, visited).await;
            }
        })
    }

    /// Host references when a provider is attached and finds any, otherwise
    /// the lexical reference index.
    async fn references_to(&self, node: &CallNode) -> Vec<Location> {
        if let Some(provider) = self.cache.host().references.as_ref() {
            match provider.references(&node.file_id, node.range.start).await {
                Ok(locations) if !locations.is_empty() => return locations,
                Ok(_) => {}
                Err(err) => debug!(method = %node.method_name, "reference provider failed: {err}"),
            }
        }
        self.cache
            .find_references(&node.method_name)
            .into_iter()
            .map(|record| Location::new(record.file_id, record.range))
            .collect()
    }
}

/// Group locations by file, keeping first-seen file order.
fn group_by_file(locations: Vec<Location>) -> Vec<(FileId, Vec<Range>)> {
    let mut slots: HashMap<FileId, usize> = HashMap::new();
    let mut groups: Vec<(FileId, Vec<Range>)> = Vec::new();
    for location in locations {
        match slots.get(&location.file_id) {
            Some(&idx) => groups[idx].1.push(location.range),
            None => {
                slots.insert(location.file_id.clone(), groups.len());
                groups.push((location.file_id, vec![location.range]));
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(file: &str, line: u32) -> Location {
        Location::new(
            FileId::new(file),
            Range::new(Position::new(line, 0), Position::new(line, 4)),
        )
    }

    #[test]
    fn grouping_keeps_first_seen_order() {
        let groups = group_by_file(vec![loc("b.rs", 1), loc("a.rs", 2), loc("b.rs", 3)]);
        let files: Vec<_> = groups.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(files, vec!["b.rs", "a.rs"]);
        assert_eq!(groups[0].1.len(), 2);
    }
}
