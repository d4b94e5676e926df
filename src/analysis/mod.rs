//! Call-tree construction over the cache.
//!
//! Both directions run as their own task. A failure or panic inside a run is
//! logged and reported as `None` instead of reaching the caller.

use crate::cache::CallCache;
use crate::config::clamp_depth;
use crate::model::{CallNode, FileId, ForwardAnalysis, Symbol};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub mod backward;
pub mod forward;

pub use backward::BackwardAnalyzer;
pub use forward::ForwardAnalyzer;

#[derive(Clone)]
pub struct Analyzer {
    cache: Arc<CallCache>,
}

impl Analyzer {
    pub fn new(cache: Arc<CallCache>) -> Self {
        Self { cache }
    }

    /// Tree of the methods that (transitively) call `root`.
    pub async fn analyze_backward(
        &self,
        root: &Symbol,
        file: &FileId,
        max_depth: usize,
    ) -> Option<CallNode> {
        let max_depth = clamp_depth(max_depth);
        let analyzer = BackwardAnalyzer::new(self.cache.clone());
        let (root, file) = (root.clone(), file.clone());
        let started = Instant::now();
        let task = tokio::spawn(async move {
            let tree = analyzer.analyze(&root, &file, max_depth).await;
            (tree, root.name)
        });
        match task.await {
            Ok((tree, name)) => {
                info!(
                    method = %name,
                    nodes = tree.count(),
                    depth = max_depth,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "caller tree built"
                );
                Some(tree)
            }
            Err(err) => {
                error!("caller analysis aborted: {err}");
                None
            }
        }
    }

    /// Forest of the calls made from `root`'s body.
    pub async fn analyze_forward(
        &self,
        root: &Symbol,
        file: &FileId,
        max_depth: usize,
    ) -> Option<ForwardAnalysis> {
        let max_depth = clamp_depth(max_depth);
        let analyzer = ForwardAnalyzer::new(self.cache.clone());
        let (root, file) = (root.clone(), file.clone());
        let started = Instant::now();
        let task =
            tokio::spawn(async move { analyzer.analyze(&root, &file, max_depth).await });
        match task.await {
            Ok(Ok(analysis)) => {
                info!(
                    method = %analysis.root_method,
                    calls = analysis.total_calls_found,
                    depth = max_depth,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "callee tree built"
                );
                Some(analysis)
            }
            Ok(Err(err)) => {
                error!("callee analysis failed: {err:#}");
                None
            }
            Err(err) => {
                error!("callee analysis aborted: {err}");
                None
            }
        }
    }
}
